//! Behavioral profiler
//!
//! Aggregates entry latency, hold durations and quick-flip behavior from a
//! wallet's cached trades plus the materialized token-launch table.

use std::collections::HashMap;

use crate::model::{TokenLaunch, Trade, TradeSide};

/// A sell within this many seconds of the first buy counts as an early exit.
pub const EARLY_EXIT_WINDOW_SECS: i64 = 600;

/// Percentile pair over a sample set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileStats {
    pub p50: f64,
    pub p90: f64,
    pub samples: u32,
}

/// Behavioral aggregates for one wallet.
#[derive(Debug, Clone, Default)]
pub struct BehaviorProfile {
    pub wallet: String,
    pub tokens_tracked: u32,
    pub total_trades: u32,
    pub total_sol_volume: f64,
    pub dex_breakdown: HashMap<String, u32>,
    /// Seconds from token launch to the wallet's first trade
    pub entry_latency_secs: PercentileStats,
    /// Seconds between first and last trade of round-trip mints
    pub hold_duration_secs: PercentileStats,
    /// Share of sold mints first-sold within the early-exit window
    pub early_exit_rate: f64,
    /// Share of tracked mints with both a buy and a sell
    pub round_trip_rate: f64,
}

/// Percentile by rank: element at index `min(n-1, ceil(p/100 * n) - 1)` of
/// the sorted sample.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = ((p / 100.0 * n as f64).ceil() as usize).saturating_sub(1);
    sorted[rank.min(n - 1)]
}

fn stats(mut samples: Vec<f64>) -> PercentileStats {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    PercentileStats {
        p50: percentile(&samples, 50.0),
        p90: percentile(&samples, 90.0),
        samples: samples.len() as u32,
    }
}

/// Per-mint trade timing extracted in one pass.
#[derive(Debug, Default, Clone, Copy)]
struct MintTiming {
    first_trade: Option<i64>,
    last_trade: Option<i64>,
    first_buy: Option<i64>,
    first_sell: Option<i64>,
    has_buy: bool,
    has_sell: bool,
}

/// Build the behavioral profile from cached trades and known launches.
pub fn build_profile(
    wallet: &str,
    trades: &[Trade],
    launches: &HashMap<String, TokenLaunch>,
) -> BehaviorProfile {
    let mut profile = BehaviorProfile {
        wallet: wallet.to_string(),
        total_trades: trades.len() as u32,
        ..Default::default()
    };

    let mut timings: HashMap<&str, MintTiming> = HashMap::new();
    for trade in trades {
        profile.total_sol_volume += trade.sol_amount;
        *profile.dex_breakdown.entry(trade.dex.clone()).or_insert(0) += 1;

        let timing = timings.entry(&trade.token_mint).or_default();
        timing.first_trade = Some(
            timing
                .first_trade
                .map_or(trade.timestamp, |t| t.min(trade.timestamp)),
        );
        timing.last_trade = Some(
            timing
                .last_trade
                .map_or(trade.timestamp, |t| t.max(trade.timestamp)),
        );
        match trade.side {
            TradeSide::Buy => {
                timing.has_buy = true;
                timing.first_buy = Some(
                    timing
                        .first_buy
                        .map_or(trade.timestamp, |t| t.min(trade.timestamp)),
                );
            }
            TradeSide::Sell => {
                timing.has_sell = true;
                timing.first_sell = Some(
                    timing
                        .first_sell
                        .map_or(trade.timestamp, |t| t.min(trade.timestamp)),
                );
            }
        }
    }

    profile.tokens_tracked = timings.len() as u32;

    let mut entry_latencies = Vec::new();
    let mut hold_durations = Vec::new();
    let mut round_trips = 0u32;
    let mut sold_mints = 0u32;
    let mut early_exits = 0u32;

    for (mint, timing) in &timings {
        if let (Some(launch), Some(first_trade)) = (launches.get(*mint), timing.first_trade) {
            // Launches recorded after the wallet's first trade are stale
            // observations, not usable latency samples.
            if launch.first_timestamp <= first_trade {
                entry_latencies.push((first_trade - launch.first_timestamp) as f64);
            }
        }

        if timing.has_buy && timing.has_sell {
            round_trips += 1;
            if let (Some(first), Some(last)) = (timing.first_trade, timing.last_trade) {
                hold_durations.push((last - first) as f64);
            }
        }

        if timing.has_sell {
            sold_mints += 1;
            if let (Some(first_buy), Some(first_sell)) = (timing.first_buy, timing.first_sell) {
                if first_sell - first_buy < EARLY_EXIT_WINDOW_SECS {
                    early_exits += 1;
                }
            }
        }
    }

    profile.entry_latency_secs = stats(entry_latencies);
    profile.hold_duration_secs = stats(hold_durations);
    if sold_mints > 0 {
        profile.early_exit_rate = early_exits as f64 / sold_mints as f64;
    }
    if profile.tokens_tracked > 0 {
        profile.round_trip_rate = round_trips as f64 / profile.tokens_tracked as f64;
    }

    profile
}
