//! Swap parser: enhanced transaction -> canonical trades
//!
//! Three strategies are tried in order; the first to produce at least one
//! trade wins:
//!
//! 1. Token-transfer ledger: net SOL and per-mint token deltas from the
//!    transfer lists, with multi-hop stablecoin legs collapsed.
//! 2. Account-data balance diffs.
//! 3. The declared swap event, if the provider emitted one.
//!
//! The parser is a pure function of its inputs and never emits a trade for
//! an intermediate (stablecoin / liquid-staking / wrapped-SOL) mint.

pub mod dex;

use std::collections::HashMap;

use crate::config::ParserSettings;
use crate::constants::{lamports_to_sol, DUST_THRESHOLD, SOL_DELTA_FLOOR};
use crate::helius::types::EnhancedTransaction;
use crate::model::{Trade, TradeSide};

pub use dex::{dex_from_program_ids, resolve_dex_label};

/// Parse one enhanced transaction into zero or more trades for `wallet`.
///
/// Failed transactions and records that none of the strategies can read
/// produce an empty vec; the latter is not an error.
pub fn parse_transaction(
    tx: &EnhancedTransaction,
    wallet: &str,
    settings: &ParserSettings,
) -> Vec<Trade> {
    if tx.failed() {
        return Vec::new();
    }

    let timestamp = tx.timestamp.unwrap_or(0);
    let mut dex = resolve_dex_label(tx.source.as_deref(), tx.tx_type.as_deref());
    if dex == "DEX Swap" || dex == "Unknown" {
        // Low-level records carry no source; the program ids still name
        // the venue.
        if let Some(label) =
            dex_from_program_ids(tx.instructions.iter().map(|i| i.program_id.as_str()))
        {
            dex = label.to_string();
        }
    }

    let trades = from_transfer_ledger(tx, wallet, settings, timestamp, &dex);
    if !trades.is_empty() {
        return trades;
    }

    let trades = from_balance_changes(tx, wallet, settings, timestamp, &dex);
    if !trades.is_empty() {
        return trades;
    }

    from_swap_event(tx, wallet, settings, timestamp, &dex)
}

/// Strategy A: reconstruct the swap from the native and token transfer
/// ledgers.
fn from_transfer_ledger(
    tx: &EnhancedTransaction,
    wallet: &str,
    settings: &ParserSettings,
    timestamp: i64,
    dex: &str,
) -> Vec<Trade> {
    let mut sol_delta = 0.0;
    for transfer in &tx.native_transfers {
        if transfer.from_user_account.as_deref() == Some(wallet) {
            sol_delta -= lamports_to_sol(transfer.amount as i64);
        }
        if transfer.to_user_account.as_deref() == Some(wallet) {
            sol_delta += lamports_to_sol(transfer.amount as i64);
        }
    }

    let mut token_deltas: HashMap<String, f64> = HashMap::new();
    for transfer in &tx.token_transfers {
        let mut delta = 0.0;
        if transfer.from_user_account.as_deref() == Some(wallet) {
            delta -= transfer.token_amount;
        }
        if transfer.to_user_account.as_deref() == Some(wallet) {
            delta += transfer.token_amount;
        }
        if delta != 0.0 {
            *token_deltas.entry(transfer.mint.clone()).or_insert(0.0) += delta;
        }
    }

    // Wrapped SOL is SOL: fold into the native delta, drop from the map.
    let mut targets: Vec<(String, f64)> = Vec::new();
    let mut intermediate_net = 0.0;
    let mut intermediate_abs = 0.0;
    for (mint, delta) in token_deltas {
        if settings.is_sol_mint(&mint) {
            sol_delta += delta;
            continue;
        }
        if delta.abs() < DUST_THRESHOLD {
            continue;
        }
        if settings.is_intermediate(&mint) {
            intermediate_net += delta;
            intermediate_abs += delta.abs();
        } else {
            targets.push((mint, delta));
        }
    }

    if targets.is_empty() {
        return Vec::new();
    }
    targets.sort_by(|a, b| a.0.cmp(&b.0));

    let total_target: f64 = targets.iter().map(|(_, d)| d.abs()).sum();
    let mut trades = Vec::new();

    if sol_delta.abs() >= SOL_DELTA_FLOOR {
        // Direct SOL <-> token swap: allocate the SOL delta across targets
        // in proportion to their token deltas.
        for (mint, delta) in &targets {
            let share = sol_delta.abs() * delta.abs() / total_target;
            if *delta > 0.0 && sol_delta < 0.0 {
                trades.push(Trade::new(
                    wallet, &tx.signature, timestamp, TradeSide::Buy, mint, *delta, share, dex,
                ));
            } else if *delta < 0.0 && sol_delta > 0.0 {
                trades.push(Trade::new(
                    wallet, &tx.signature, timestamp, TradeSide::Sell, mint, -*delta, share, dex,
                ));
            }
        }
    } else if intermediate_abs > 0.0 {
        // Multi-hop through a stablecoin leg: the intermediate flow stands
        // in for the SOL value. A residual native delta, when present, is
        // the better magnitude; otherwise the configured stable->SOL
        // divisor converts the proxy.
        let value = if sol_delta.abs() > 1e-9 {
            sol_delta.abs()
        } else {
            intermediate_abs / settings.sol_per_stable_unit
        };
        for (mint, delta) in &targets {
            let share = value * delta.abs() / total_target;
            if intermediate_net < 0.0 && *delta > 0.0 {
                trades.push(Trade::new(
                    wallet, &tx.signature, timestamp, TradeSide::Buy, mint, *delta, share, dex,
                ));
            } else if intermediate_net > 0.0 && *delta < 0.0 {
                trades.push(Trade::new(
                    wallet, &tx.signature, timestamp, TradeSide::Sell, mint, -*delta, share, dex,
                ));
            }
        }
    } else {
        // No SOL, no intermediate flow: incoming tokens are zero-cost
        // acquisitions (airdrop / free mint).
        for (mint, delta) in &targets {
            if *delta > 0.0 {
                trades.push(Trade::new(
                    wallet, &tx.signature, timestamp, TradeSide::Buy, mint, *delta, 0.0, dex,
                ));
            }
        }
    }

    trades
}

/// Strategy B: per-account balance diffs. Token changes are attributed by
/// the token account's owner, not the outer account entry.
fn from_balance_changes(
    tx: &EnhancedTransaction,
    wallet: &str,
    settings: &ParserSettings,
    timestamp: i64,
    dex: &str,
) -> Vec<Trade> {
    let mut sol_delta = 0.0;
    let mut token_deltas: HashMap<String, f64> = HashMap::new();

    for entry in &tx.account_data {
        if entry.account == wallet {
            sol_delta += lamports_to_sol(entry.native_balance_change);
        }
        for change in &entry.token_balance_changes {
            if change.user_account.as_deref() != Some(wallet) {
                continue;
            }
            if settings.is_intermediate(&change.mint) {
                continue;
            }
            *token_deltas.entry(change.mint.clone()).or_insert(0.0) +=
                change.raw_token_amount.ui_amount();
        }
    }

    let mut mints: Vec<(String, f64)> = token_deltas
        .into_iter()
        .filter(|(_, d)| d.abs() >= DUST_THRESHOLD)
        .collect();
    mints.sort_by(|a, b| a.0.cmp(&b.0));

    let mut trades = Vec::new();
    for (mint, delta) in mints {
        if delta > 0.0 {
            // Zero SOL deltas survive as zero-cost buys.
            trades.push(Trade::new(
                wallet,
                &tx.signature,
                timestamp,
                TradeSide::Buy,
                &mint,
                delta,
                sol_delta.abs(),
                dex,
            ));
        } else {
            trades.push(Trade::new(
                wallet,
                &tx.signature,
                timestamp,
                TradeSide::Sell,
                &mint,
                -delta,
                sol_delta.max(0.0),
                dex,
            ));
        }
    }

    trades
}

/// Strategy C: the provider's declared swap event. Native input plus token
/// outputs map to buys; token inputs plus native output map to sells.
fn from_swap_event(
    tx: &EnhancedTransaction,
    wallet: &str,
    settings: &ParserSettings,
    timestamp: i64,
    dex: &str,
) -> Vec<Trade> {
    let Some(swap) = tx.events.swap.as_ref() else {
        return Vec::new();
    };

    let mut trades = Vec::new();

    if let Some(native_in) = &swap.native_input {
        let sol = native_in.sol_amount();
        let outputs: Vec<_> = swap
            .token_outputs
            .iter()
            .filter(|leg| !settings.is_intermediate(&leg.mint))
            .collect();
        let total: f64 = outputs
            .iter()
            .map(|leg| leg.raw_token_amount.ui_amount())
            .sum();
        for leg in outputs {
            let amount = leg.raw_token_amount.ui_amount();
            if amount < DUST_THRESHOLD {
                continue;
            }
            let share = if total > 0.0 { sol * amount / total } else { 0.0 };
            trades.push(Trade::new(
                wallet,
                &tx.signature,
                timestamp,
                TradeSide::Buy,
                &leg.mint,
                amount,
                share,
                dex,
            ));
        }
    }

    if let Some(native_out) = &swap.native_output {
        let sol = native_out.sol_amount();
        let inputs: Vec<_> = swap
            .token_inputs
            .iter()
            .filter(|leg| !settings.is_intermediate(&leg.mint))
            .collect();
        let total: f64 = inputs
            .iter()
            .map(|leg| leg.raw_token_amount.ui_amount())
            .sum();
        for leg in inputs {
            let amount = leg.raw_token_amount.ui_amount();
            if amount < DUST_THRESHOLD {
                continue;
            }
            let share = if total > 0.0 { sol * amount / total } else { 0.0 };
            trades.push(Trade::new(
                wallet,
                &tx.signature,
                timestamp,
                TradeSide::Sell,
                &leg.mint,
                amount,
                share,
                dex,
            ));
        }
    }

    trades
}
