//! Period-scoped PnL reporting
//!
//! Sells inside the window are priced against the wallet's lifetime
//! average buy price rather than a per-window FIFO replay. That keeps a
//! 24h view correct when the position was opened before the window, at
//! the cost of being an approximation of true per-period FIFO (the store
//! does not keep historical lot state to replay from).

use std::collections::{BTreeMap, HashMap};

use crate::model::{Position, Trade, TradeSide};

/// Reporting timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    H24,
    D7,
    D30,
    D90,
    All,
}

impl Timeframe {
    /// Window length in seconds; None means all time.
    pub fn duration_secs(&self) -> Option<i64> {
        match self {
            Timeframe::H24 => Some(24 * 3600),
            Timeframe::D7 => Some(7 * 24 * 3600),
            Timeframe::D30 => Some(30 * 24 * 3600),
            Timeframe::D90 => Some(90 * 24 * 3600),
            Timeframe::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::H24 => "24h",
            Timeframe::D7 => "7d",
            Timeframe::D30 => "30d",
            Timeframe::D90 => "90d",
            Timeframe::All => "all",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Timeframe::H24),
            "7d" => Ok(Timeframe::D7),
            "30d" => Ok(Timeframe::D30),
            "90d" => Ok(Timeframe::D90),
            "all" => Ok(Timeframe::All),
            other => Err(format!(
                "unknown timeframe: {} (expected 24h, 7d, 30d, 90d or all)",
                other
            )),
        }
    }
}

/// One sell's contribution inside the window.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub token_mint: String,
    pub signature: String,
    pub timestamp: i64,
    pub pnl_sol: f64,
}

/// Aggregated report for one wallet and timeframe.
#[derive(Debug, Clone)]
pub struct PeriodSummary {
    pub wallet: String,
    pub timeframe: Timeframe,
    pub period_start: i64,
    pub realized_pnl_sol: f64,
    pub win_count: u32,
    pub loss_count: u32,
    pub trade_count: u32,
    pub total_sol_volume: f64,
    pub avg_trade_size_sol: f64,
    pub unique_tokens: u32,
    pub avg_hold_duration_secs: f64,
    pub best_trade: Option<TradeOutcome>,
    pub worst_trade: Option<TradeOutcome>,
}

/// Build the period summary from the wallet's full trade history and its
/// lifetime positions (which must be freshly recomputed by the caller).
pub fn summarize(
    wallet: &str,
    all_trades: &[Trade],
    positions: &[Position],
    timeframe: Timeframe,
    now: i64,
) -> PeriodSummary {
    let period_start = timeframe
        .duration_secs()
        .map(|d| now - d)
        .unwrap_or(0);

    let avg_price: HashMap<&str, f64> = positions
        .iter()
        .map(|p| (p.token_mint.as_str(), p.avg_buy_price))
        .collect();

    let in_period: Vec<&Trade> = all_trades
        .iter()
        .filter(|t| t.timestamp >= period_start)
        .collect();

    let mut by_mint: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in &in_period {
        by_mint.entry(&trade.token_mint).or_default().push(trade);
    }

    let mut summary = PeriodSummary {
        wallet: wallet.to_string(),
        timeframe,
        period_start,
        realized_pnl_sol: 0.0,
        win_count: 0,
        loss_count: 0,
        trade_count: in_period.len() as u32,
        total_sol_volume: in_period.iter().map(|t| t.sol_amount).sum(),
        avg_trade_size_sol: 0.0,
        unique_tokens: by_mint.len() as u32,
        avg_hold_duration_secs: 0.0,
        best_trade: None,
        worst_trade: None,
    };
    if summary.trade_count > 0 {
        summary.avg_trade_size_sol = summary.total_sol_volume / summary.trade_count as f64;
    }

    let mut hold_durations: Vec<f64> = Vec::new();

    for (mint, trades) in &by_mint {
        let lifetime_avg = avg_price.get(mint).copied().unwrap_or(0.0);
        let mut had_sell = false;

        for trade in trades {
            if trade.side != TradeSide::Sell {
                continue;
            }
            had_sell = true;
            let contribution = trade.sol_amount - trade.token_amount * lifetime_avg;
            summary.realized_pnl_sol += contribution;
            if contribution > 0.0 {
                summary.win_count += 1;
            } else {
                summary.loss_count += 1;
            }

            let outcome = TradeOutcome {
                token_mint: trade.token_mint.clone(),
                signature: trade.signature.clone(),
                timestamp: trade.timestamp,
                pnl_sol: contribution,
            };
            if summary
                .best_trade
                .as_ref()
                .map(|b| contribution > b.pnl_sol)
                .unwrap_or(true)
            {
                summary.best_trade = Some(outcome.clone());
            }
            if summary
                .worst_trade
                .as_ref()
                .map(|w| contribution < w.pnl_sol)
                .unwrap_or(true)
            {
                summary.worst_trade = Some(outcome);
            }
        }

        if had_sell {
            let first = trades.iter().map(|t| t.timestamp).min().unwrap_or(0);
            let last = trades.iter().map(|t| t.timestamp).max().unwrap_or(0);
            hold_durations.push((last - first) as f64);
        }
    }

    if !hold_durations.is_empty() {
        summary.avg_hold_duration_secs =
            hold_durations.iter().sum::<f64>() / hold_durations.len() as f64;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnl::fifo::compute_wallet_fifo;
    use std::str::FromStr;

    const WALLET: &str = "Wa11et";
    const MINT: &str = "MintA";

    fn trade(signature: &str, ts: i64, side: TradeSide, amount: f64, sol: f64) -> Trade {
        Trade::new(WALLET, signature, ts, side, MINT, amount, sol, "Raydium")
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!(Timeframe::from_str("24h").unwrap(), Timeframe::H24);
        assert_eq!(Timeframe::from_str("all").unwrap(), Timeframe::All);
        assert!(Timeframe::from_str("1y").is_err());
        assert_eq!(Timeframe::D7.duration_secs(), Some(604_800));
        assert_eq!(Timeframe::All.duration_secs(), None);
    }

    #[test]
    fn test_window_uses_lifetime_cost_basis() {
        // Buy at t=0 for 1 SOL (amount 1), sell now for 2 SOL. The buy is
        // far outside the 24h window, yet the period PnL is a full 1.0
        // because the lifetime average buy price carries over.
        let now = 10_000_000;
        let trades = vec![
            trade("s1", 0, TradeSide::Buy, 1.0, 1.0),
            trade("s2", now, TradeSide::Sell, 1.0, 2.0),
        ];
        let state = compute_wallet_fifo(WALLET, &trades);

        let summary = summarize(WALLET, &trades, &state.positions, Timeframe::H24, now);
        assert_eq!(summary.trade_count, 1); // only the sell is in-window
        assert!((summary.realized_pnl_sol - 1.0).abs() < 1e-9);
        assert_eq!(summary.win_count, 1);
        assert_eq!(summary.loss_count, 0);
    }

    #[test]
    fn test_all_timeframe_covers_everything() {
        let now = 10_000_000;
        let trades = vec![
            trade("s1", 0, TradeSide::Buy, 100.0, 1.0),
            trade("s2", now, TradeSide::Sell, 100.0, 3.0),
        ];
        let state = compute_wallet_fifo(WALLET, &trades);

        let summary = summarize(WALLET, &trades, &state.positions, Timeframe::All, now);
        assert_eq!(summary.period_start, 0);
        assert_eq!(summary.trade_count, 2);
        assert!((summary.total_sol_volume - 4.0).abs() < 1e-9);
        assert!((summary.avg_trade_size_sol - 2.0).abs() < 1e-9);
        assert!((summary.realized_pnl_sol - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_and_worst_trades() {
        let now = 1000;
        let trades = vec![
            trade("s1", 100, TradeSide::Buy, 200.0, 2.0), // avg price 0.01
            trade("s2", 500, TradeSide::Sell, 100.0, 3.0), // +2.0
            trade("s3", 600, TradeSide::Sell, 100.0, 0.5), // -0.5
        ];
        let state = compute_wallet_fifo(WALLET, &trades);

        let summary = summarize(WALLET, &trades, &state.positions, Timeframe::All, now);
        let best = summary.best_trade.as_ref().unwrap();
        let worst = summary.worst_trade.as_ref().unwrap();
        assert_eq!(best.signature, "s2");
        assert!((best.pnl_sol - 2.0).abs() < 1e-9);
        assert_eq!(worst.signature, "s3");
        assert!((worst.pnl_sol + 0.5).abs() < 1e-9);
        assert_eq!(summary.win_count, 1);
        assert_eq!(summary.loss_count, 1);
    }

    #[test]
    fn test_hold_duration_counts_only_mints_with_sells() {
        let now = 1000;
        let mut trades = vec![
            trade("s1", 100, TradeSide::Buy, 10.0, 1.0),
            trade("s2", 700, TradeSide::Sell, 10.0, 1.2),
        ];
        // Second mint: buy only, no sell, so it contributes no duration.
        trades.push(Trade::new(
            WALLET, "s3", 200, TradeSide::Buy, "MintB", 5.0, 0.5, "Orca",
        ));
        let state = compute_wallet_fifo(WALLET, &trades);

        let summary = summarize(WALLET, &trades, &state.positions, Timeframe::All, now);
        assert_eq!(summary.unique_tokens, 2);
        assert!((summary.avg_hold_duration_secs - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_period() {
        let now = 10_000_000;
        let trades = vec![trade("s1", 0, TradeSide::Buy, 1.0, 1.0)];
        let state = compute_wallet_fifo(WALLET, &trades);

        let summary = summarize(WALLET, &trades, &state.positions, Timeframe::H24, now);
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.realized_pnl_sol, 0.0);
        assert!(summary.best_trade.is_none());
        assert_eq!(summary.avg_hold_duration_secs, 0.0);
    }
}
