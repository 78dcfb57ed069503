//! Provider payload types
//!
//! Mirrors the enhanced-transaction shape returned by the Helius v0 API.
//! Token amounts arrive either as UI floats (token transfers) or as raw
//! string integers scaled by 10^decimals (balance changes).

use serde::{Deserialize, Serialize};

/// One entry from `getSignaturesForAddress`, newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

/// An enhanced transaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTransaction {
    pub signature: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(rename = "type", default)]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub transaction_error: Option<serde_json::Value>,
    #[serde(default)]
    pub native_transfers: Vec<NativeTransfer>,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    #[serde(default)]
    pub account_data: Vec<AccountData>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub events: TxEvents,
}

impl EnhancedTransaction {
    /// True when the transaction failed on-chain; failed transactions never
    /// produce trades.
    pub fn failed(&self) -> bool {
        self.transaction_error.is_some()
    }
}

/// Lamport movement between two user accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    /// Lamports, always positive; direction is given by from/to
    pub amount: u64,
}

/// SPL token movement in UI units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    pub mint: String,
    #[serde(default)]
    pub token_amount: f64,
}

/// Per-account balance diff section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub account: String,
    #[serde(default)]
    pub native_balance_change: i64,
    #[serde(default)]
    pub token_balance_changes: Vec<TokenBalanceChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceChange {
    pub mint: String,
    /// Owner of the token account; this, not the outer account, identifies
    /// whose balance moved.
    #[serde(default)]
    pub user_account: Option<String>,
    pub raw_token_amount: RawTokenAmount,
}

/// Raw string integer scaled by 10^decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenAmount {
    pub token_amount: String,
    pub decimals: i32,
}

impl RawTokenAmount {
    /// Convert to UI units. Unparseable amounts collapse to 0.
    pub fn ui_amount(&self) -> f64 {
        let raw: f64 = self.token_amount.parse().unwrap_or(0.0);
        raw / 10f64.powi(self.decimals)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    #[serde(default)]
    pub program_id: String,
}

/// Structured event section; only the swap event is consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxEvents {
    #[serde(default)]
    pub swap: Option<SwapEvent>,
}

/// Declared swap event (parser strategy of last resort).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    #[serde(default)]
    pub native_input: Option<NativeSwapLeg>,
    #[serde(default)]
    pub native_output: Option<NativeSwapLeg>,
    #[serde(default)]
    pub token_inputs: Vec<TokenSwapLeg>,
    #[serde(default)]
    pub token_outputs: Vec<TokenSwapLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSwapLeg {
    #[serde(default)]
    pub account: Option<String>,
    /// Lamports as a string integer
    pub amount: String,
}

impl NativeSwapLeg {
    pub fn sol_amount(&self) -> f64 {
        let lamports: f64 = self.amount.parse().unwrap_or(0.0);
        lamports / crate::constants::LAMPORTS_PER_SOL as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSwapLeg {
    #[serde(default)]
    pub user_account: Option<String>,
    pub mint: String,
    pub raw_token_amount: RawTokenAmount,
}
