//! Canonical data model: trades, positions, lots, wallets and scores.
//!
//! Every subsystem speaks these types. Amounts are real SOL / UI token
//! units; timestamps are unix seconds.

use serde::{Deserialize, Serialize};

/// Buy or sell side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

impl std::str::FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(format!("unknown trade side: {}", other)),
        }
    }
}

/// An atomic buy or sell extracted from one on-chain transaction.
///
/// The id is deterministic (`signature:side:mint`) so re-ingesting the same
/// transaction replaces rather than duplicates the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub wallet: String,
    pub signature: String,
    pub timestamp: i64,
    pub side: TradeSide,
    pub token_mint: String,
    /// Token amount in UI units, always non-negative
    pub token_amount: f64,
    /// SOL paid (buy) or received (sell), always non-negative
    pub sol_amount: f64,
    /// SOL per token; 0 for zero-cost acquisitions
    pub price_per_token: f64,
    /// DEX label resolved from the provider's source field
    pub dex: String,
}

impl Trade {
    /// Deterministic trade id
    pub fn trade_id(signature: &str, side: TradeSide, mint: &str) -> String {
        format!("{}:{}:{}", signature, side.as_str(), mint)
    }

    /// Build a trade, deriving id and unit price.
    pub fn new(
        wallet: &str,
        signature: &str,
        timestamp: i64,
        side: TradeSide,
        token_mint: &str,
        token_amount: f64,
        sol_amount: f64,
        dex: &str,
    ) -> Self {
        let price_per_token = if token_amount > 0.0 {
            sol_amount / token_amount
        } else {
            0.0
        };
        Self {
            id: Self::trade_id(signature, side, token_mint),
            wallet: wallet.to_string(),
            signature: signature.to_string(),
            timestamp,
            side,
            token_mint: token_mint.to_string(),
            token_amount,
            sol_amount,
            price_per_token,
            dex: dex.to_string(),
        }
    }
}

/// Per (wallet, token) lifetime aggregate. Recomputed in full whenever the
/// wallet's trades change; never patched incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    pub wallet: String,
    pub token_mint: String,
    pub total_bought: f64,
    pub total_sold: f64,
    pub total_cost_sol: f64,
    pub total_proceeds_sol: f64,
    pub remaining_tokens: f64,
    pub avg_buy_price: f64,
    pub realized_pnl_sol: f64,
    pub trade_count: u32,
    /// Sells with positive realized PnL
    pub win_count: u32,
    pub first_trade_at: i64,
    pub last_trade_at: i64,
}

impl Position {
    /// True once the wallet has sold out of the token (within dust).
    pub fn is_exited(&self) -> bool {
        self.total_sold > 0.0 && self.remaining_tokens <= crate::constants::DUST_THRESHOLD
    }
}

/// An open FIFO cost-basis lot. Created on buy, consumed oldest-first by
/// sells; fully consumed lots are deleted from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBasisLot {
    pub wallet: String,
    pub token_mint: String,
    /// Trade id of the originating buy
    pub trade_id: String,
    pub timestamp: i64,
    pub original_amount: f64,
    pub remaining_amount: f64,
    pub price_per_token: f64,
}

/// Cached rollup fields shown on wallet listings. Written only after the
/// corresponding trade set is fully persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WalletRollups {
    pub total_realized_pnl: f64,
    pub win_rate: f64,
    pub total_sol_volume: f64,
    pub total_trades: u32,
    pub quick_flip_rate: f64,
    pub exited_token_rate: f64,
}

/// A tracked wallet: identity, display metadata, sync cursor and rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedWallet {
    pub address: String,
    pub user_id: String,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub alerts_on: bool,
    pub last_synced_at: Option<i64>,
    pub first_synced_at: Option<i64>,
    /// Newest ingested signature; the incremental fetch stops here
    pub last_signature: Option<String>,
    pub total_transactions: u32,
    pub rollups: WalletRollups,
    pub created_at: i64,
}

impl TrackedWallet {
    pub fn new(address: &str, user_id: &str, now: i64) -> Self {
        Self {
            address: address.to_string(),
            user_id: user_id.to_string(),
            name: None,
            emoji: None,
            alerts_on: false,
            last_synced_at: None,
            first_synced_at: None,
            last_signature: None,
            total_transactions: 0,
            rollups: WalletRollups::default(),
            created_at: now,
        }
    }
}

/// A raw ingested on-chain record. Content is write-once; only the parsed
/// flag mutates.
#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub signature: String,
    pub wallet: String,
    pub block_time: i64,
    pub slot: u64,
    /// Opaque provider payload (JSON)
    pub payload: String,
    pub parsed: bool,
}

/// Earliest observation of a mint across all stored raw transactions.
#[derive(Debug, Clone)]
pub struct TokenLaunch {
    pub mint: String,
    pub signature: String,
    pub first_timestamp: i64,
    pub slot: u64,
}

/// Cached token display metadata
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub mint: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
    pub last_updated: i64,
}

/// Copy-trade simulation output for one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowScore {
    pub wallet: String,
    pub delay_seconds: u32,
    pub slippage_model: String,
    pub actual_pnl_sol: f64,
    pub simulated_pnl_sol: f64,
    /// simulated / actual when actual > 0, else 0; may be negative
    pub followability_ratio: f64,
    /// Share of round-trip mints first-sold within 60s
    pub quick_dump_rate: f64,
    pub avg_time_to_first_sell_secs: f64,
    pub median_time_to_first_sell_secs: f64,
    pub followable_tokens: u32,
    pub unfollowable_tokens: u32,
    pub avg_entry_size_sol: f64,
    pub computed_at: i64,
}
