//! Follow simulator
//!
//! Replays a wallet's round-trips as a copy-trader would experience them:
//! entries and exits pay size-bucketed slippage plus a delay-proportional
//! price drift, and each round-trip's simulated PnL is weighted by how
//! quickly the wallet dumped (a 20-second flip is uncopyable regardless of
//! its paper profit).

use std::collections::BTreeMap;

use crate::model::{FollowScore, Trade, TradeSide};

/// Price drift per second of copy delay (~0.1%/s), applied to entry and
/// exit alike.
pub const DRIFT_PER_DELAY_SECOND: f64 = 0.001;

/// First sell within this many seconds of first buy flags a quick dump.
pub const QUICK_DUMP_WINDOW_SECS: i64 = 60;

/// Slippage model: trade-size bucket -> impact fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageModel {
    Conservative,
    Moderate,
    Aggressive,
}

impl SlippageModel {
    /// Slippage fraction for a trade of `size_sol`.
    /// Buckets: small < 0.5 SOL, medium < 2 SOL, large otherwise.
    pub fn slippage_for(&self, size_sol: f64) -> f64 {
        let bucket = if size_sol < 0.5 {
            0
        } else if size_sol < 2.0 {
            1
        } else {
            2
        };
        match self {
            SlippageModel::Conservative => [0.01, 0.02, 0.05][bucket],
            SlippageModel::Moderate => [0.02, 0.05, 0.10][bucket],
            SlippageModel::Aggressive => [0.03, 0.08, 0.15][bucket],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlippageModel::Conservative => "conservative",
            SlippageModel::Moderate => "moderate",
            SlippageModel::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for SlippageModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(SlippageModel::Conservative),
            "moderate" => Ok(SlippageModel::Moderate),
            "aggressive" => Ok(SlippageModel::Aggressive),
            other => Err(format!(
                "unknown slippage model: {} (expected conservative, moderate or aggressive)",
                other
            )),
        }
    }
}

/// Simulation parameters.
#[derive(Debug, Clone, Copy)]
pub struct FollowParams {
    pub delay_seconds: u32,
    pub model: SlippageModel,
}

impl Default for FollowParams {
    fn default() -> Self {
        Self {
            delay_seconds: 5,
            model: SlippageModel::Moderate,
        }
    }
}

/// How copyable a round-trip is, from its time-to-first-sell. Sub-30s
/// exits are unfollowable; a wallet holding five minutes is fully
/// copyable.
pub fn followability_score(time_to_first_sell_secs: i64) -> f64 {
    if time_to_first_sell_secs < 30 {
        0.0
    } else if time_to_first_sell_secs < 60 {
        0.2
    } else if time_to_first_sell_secs < 120 {
        0.5
    } else if time_to_first_sell_secs < 300 {
        0.8
    } else {
        1.0
    }
}

/// Per-mint simulation detail.
#[derive(Debug, Clone)]
pub struct MintSimulation {
    pub token_mint: String,
    pub actual_pnl_sol: f64,
    pub simulated_pnl_sol: f64,
    pub followability: f64,
    pub time_to_first_sell_secs: i64,
    pub quick_dump: bool,
}

/// Full simulation result: the persisted score plus per-mint breakdown.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub score: FollowScore,
    pub mints: Vec<MintSimulation>,
}

/// Replay every round-trip mint (at least one buy and one sell) under the
/// given delay and slippage model.
pub fn simulate_wallet(
    wallet: &str,
    trades: &[Trade],
    params: &FollowParams,
    now: i64,
) -> SimulationReport {
    let drift = params.delay_seconds as f64 * DRIFT_PER_DELAY_SECOND;

    let mut by_mint: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        by_mint.entry(&trade.token_mint).or_default().push(trade);
    }

    let mut mints = Vec::new();
    let mut actual_total = 0.0;
    let mut simulated_total = 0.0;
    let mut quick_dumps = 0u32;
    let mut followable = 0u32;
    let mut unfollowable = 0u32;
    let mut sell_latencies: Vec<f64> = Vec::new();
    let mut entry_sizes: Vec<f64> = Vec::new();

    for (mint, mint_trades) in &by_mint {
        let buys: Vec<&&Trade> = mint_trades.iter().filter(|t| t.side.is_buy()).collect();
        let sells: Vec<&&Trade> = mint_trades.iter().filter(|t| !t.side.is_buy()).collect();
        if buys.is_empty() || sells.is_empty() {
            continue;
        }

        let first_buy = buys.iter().map(|t| t.timestamp).min().unwrap_or(0);
        let first_sell = sells.iter().map(|t| t.timestamp).min().unwrap_or(0);
        let time_to_first_sell = first_sell - first_buy;
        let score = followability_score(time_to_first_sell);

        let actual: f64 = sells.iter().map(|t| t.sol_amount).sum::<f64>()
            - buys.iter().map(|t| t.sol_amount).sum::<f64>();
        let simulated_cost: f64 = buys
            .iter()
            .map(|t| t.sol_amount * (1.0 + params.model.slippage_for(t.sol_amount) + drift))
            .sum();
        let simulated_proceeds: f64 = sells
            .iter()
            .map(|t| t.sol_amount * (1.0 - params.model.slippage_for(t.sol_amount) - drift))
            .sum();
        let simulated = (simulated_proceeds - simulated_cost) * score;

        actual_total += actual;
        simulated_total += simulated;
        let quick_dump = time_to_first_sell < QUICK_DUMP_WINDOW_SECS;
        if quick_dump {
            quick_dumps += 1;
        }
        if score >= 0.5 {
            followable += 1;
        } else {
            unfollowable += 1;
        }
        sell_latencies.push(time_to_first_sell as f64);
        entry_sizes.extend(buys.iter().map(|t| t.sol_amount));

        mints.push(MintSimulation {
            token_mint: (*mint).to_string(),
            actual_pnl_sol: actual,
            simulated_pnl_sol: simulated,
            followability: score,
            time_to_first_sell_secs: time_to_first_sell,
            quick_dump,
        });
    }

    let round_trips = mints.len() as u32;
    let followability_ratio = if actual_total > 0.0 {
        simulated_total / actual_total
    } else {
        0.0
    };

    sell_latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let avg_latency = if sell_latencies.is_empty() {
        0.0
    } else {
        sell_latencies.iter().sum::<f64>() / sell_latencies.len() as f64
    };
    let median_latency = if sell_latencies.is_empty() {
        0.0
    } else {
        sell_latencies[sell_latencies.len() / 2]
    };
    let avg_entry = if entry_sizes.is_empty() {
        0.0
    } else {
        entry_sizes.iter().sum::<f64>() / entry_sizes.len() as f64
    };

    let score = FollowScore {
        wallet: wallet.to_string(),
        delay_seconds: params.delay_seconds,
        slippage_model: params.model.as_str().to_string(),
        actual_pnl_sol: actual_total,
        simulated_pnl_sol: simulated_total,
        followability_ratio,
        quick_dump_rate: if round_trips > 0 {
            quick_dumps as f64 / round_trips as f64
        } else {
            0.0
        },
        avg_time_to_first_sell_secs: avg_latency,
        median_time_to_first_sell_secs: median_latency,
        followable_tokens: followable,
        unfollowable_tokens: unfollowable,
        avg_entry_size_sol: avg_entry,
        computed_at: now,
    };

    SimulationReport { score, mints }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "Wa11et";

    fn buy(mint: &str, signature: &str, ts: i64, sol: f64) -> Trade {
        Trade::new(WALLET, signature, ts, TradeSide::Buy, mint, 1000.0, sol, "Pump.fun")
    }

    fn sell(mint: &str, signature: &str, ts: i64, sol: f64) -> Trade {
        Trade::new(WALLET, signature, ts, TradeSide::Sell, mint, 1000.0, sol, "Pump.fun")
    }

    #[test]
    fn test_slippage_buckets() {
        let model = SlippageModel::Moderate;
        assert_eq!(model.slippage_for(0.49), 0.02);
        assert_eq!(model.slippage_for(0.5), 0.05);
        assert_eq!(model.slippage_for(1.99), 0.05);
        assert_eq!(model.slippage_for(2.0), 0.10);
        assert_eq!(SlippageModel::Conservative.slippage_for(10.0), 0.05);
        assert_eq!(SlippageModel::Aggressive.slippage_for(0.1), 0.03);
    }

    #[test]
    fn test_followability_tiers() {
        assert_eq!(followability_score(0), 0.0);
        assert_eq!(followability_score(29), 0.0);
        assert_eq!(followability_score(30), 0.2);
        assert_eq!(followability_score(59), 0.2);
        assert_eq!(followability_score(60), 0.5);
        assert_eq!(followability_score(119), 0.5);
        assert_eq!(followability_score(120), 0.8);
        assert_eq!(followability_score(299), 0.8);
        assert_eq!(followability_score(300), 1.0);
    }

    #[test]
    fn test_quick_dump_zeroes_simulated_pnl() {
        // First sell 20s after first buy: score 0, simulated contribution 0,
        // quick-dump flagged.
        let trades = vec![
            buy("MintA", "s1", 100, 1.0),
            sell("MintA", "s2", 120, 5.0),
        ];
        let report = simulate_wallet(WALLET, &trades, &FollowParams::default(), 1000);

        assert_eq!(report.mints.len(), 1);
        let mint = &report.mints[0];
        assert!(mint.quick_dump);
        assert_eq!(mint.followability, 0.0);
        assert_eq!(mint.simulated_pnl_sol, 0.0);
        assert!((mint.actual_pnl_sol - 4.0).abs() < 1e-9);
        assert_eq!(report.score.quick_dump_rate, 1.0);
        assert_eq!(report.score.unfollowable_tokens, 1);
        assert_eq!(report.score.followable_tokens, 0);
        assert_eq!(report.score.followability_ratio, 0.0);
    }

    #[test]
    fn test_slippage_and_drift_applied_both_ways() {
        // 1.0 SOL entry (medium, 5%), 1.0 SOL exit, 5s delay -> 0.5% drift.
        // Cost = 1.0 * 1.055 = 1.055; proceeds = 1.0 * 0.945 = 0.945.
        // Held 400s -> score 1.0. Simulated = -0.11.
        let trades = vec![
            buy("MintA", "s1", 0, 1.0),
            sell("MintA", "s2", 400, 1.0),
        ];
        let report = simulate_wallet(WALLET, &trades, &FollowParams::default(), 1000);

        let mint = &report.mints[0];
        assert_eq!(mint.followability, 1.0);
        assert!((mint.simulated_pnl_sol + 0.11).abs() < 1e-9);
        assert_eq!(mint.actual_pnl_sol, 0.0);
    }

    #[test]
    fn test_negative_ratio_for_profitable_but_uncopyable_wallet() {
        // Profitable wallet whose follower loses: a 90s hold (score 0.5)
        // with thin margins goes negative after slippage.
        let trades = vec![
            buy("MintA", "s1", 0, 2.0),
            sell("MintA", "s2", 90, 2.1),
        ];
        let report = simulate_wallet(WALLET, &trades, &FollowParams::default(), 1000);

        assert!(report.score.actual_pnl_sol > 0.0);
        assert!(report.score.simulated_pnl_sol < 0.0);
        assert!(report.score.followability_ratio < 0.0);
    }

    #[test]
    fn test_open_positions_are_skipped() {
        let trades = vec![
            buy("MintA", "s1", 0, 1.0),
            buy("MintB", "s2", 0, 1.0),
            sell("MintB", "s3", 400, 2.0),
        ];
        let report = simulate_wallet(WALLET, &trades, &FollowParams::default(), 1000);
        assert_eq!(report.mints.len(), 1);
        assert_eq!(report.mints[0].token_mint, "MintB");
        // Entry sizes only count simulated mints.
        assert!((report.score.avg_entry_size_sol - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_stats() {
        let trades = vec![
            buy("MintA", "s1", 0, 1.0),
            sell("MintA", "s2", 100, 1.0),
            buy("MintB", "s3", 0, 1.0),
            sell("MintB", "s4", 300, 1.0),
            buy("MintC", "s5", 0, 1.0),
            sell("MintC", "s6", 20, 1.0),
        ];
        let report = simulate_wallet(WALLET, &trades, &FollowParams::default(), 1000);

        assert!((report.score.avg_time_to_first_sell_secs - 140.0).abs() < 1e-9);
        assert!((report.score.median_time_to_first_sell_secs - 100.0).abs() < 1e-9);
        // One quick dump out of three round-trips.
        assert!((report.score.quick_dump_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_wallet() {
        let report = simulate_wallet(WALLET, &[], &FollowParams::default(), 1000);
        assert!(report.mints.is_empty());
        assert_eq!(report.score.followability_ratio, 0.0);
        assert_eq!(report.score.avg_entry_size_sol, 0.0);
    }
}
