//! CLI command implementations

use anyhow::Result;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::error::Error;
use crate::follow::{simulate_wallet, FollowParams, SlippageModel};
use crate::helius::HeliusClient;
use crate::pnl::fifo::recompute_wallet;
use crate::pnl::summary::{summarize, Timeframe};
use crate::profile::build_profile;
use crate::sync::{StatusLevel, SyncCoordinator};

/// Owner id for the local CLI catalog.
const LOCAL_USER: &str = "local";

fn open_store(config: &Config) -> Result<Arc<Store>> {
    Ok(Arc::new(Store::open(&config.database)?))
}

fn validate_address(address: &str) -> Result<()> {
    Pubkey::from_str(address)
        .map_err(|_| Error::InvalidAddress(address.to_string()))?;
    Ok(())
}

fn build_coordinator(config: &Config, store: Arc<Store>) -> Result<Arc<SyncCoordinator>> {
    let client = HeliusClient::new(&config.provider)?;
    Ok(Arc::new(SyncCoordinator::new(
        store,
        Arc::new(client),
        config.parser.clone(),
        config.sync.clone(),
        LOCAL_USER,
    )))
}

/// Forward coordinator status events to the log until the channel closes.
fn spawn_status_printer(coordinator: &SyncCoordinator) {
    let mut rx = coordinator.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let wallet = event.wallet.as_deref().unwrap_or("-");
            match event.level {
                StatusLevel::Progress => {
                    if let (Some(current), Some(total)) = (event.current, event.total) {
                        info!("[{}] {} ({}/{})", wallet, event.message, current, total);
                    } else {
                        info!("[{}] {}", wallet, event.message);
                    }
                }
                StatusLevel::Warning => warn!("[{}] {}", wallet, event.message),
                StatusLevel::Error => error!("[{}] {}", wallet, event.message),
                _ => info!("[{}] {}", wallet, event.message),
            }
        }
    });
}

/// Track a new wallet.
pub async fn wallet_add(
    config: &Config,
    address: &str,
    name: Option<&str>,
    emoji: Option<&str>,
) -> Result<()> {
    validate_address(address)?;
    let store = open_store(config)?;
    let now = chrono::Utc::now().timestamp();
    let wallet = store.add_wallet(address, LOCAL_USER, name, emoji, now)?;
    println!(
        "Tracking {} {}",
        wallet.address,
        wallet.name.as_deref().unwrap_or("")
    );
    Ok(())
}

/// Stop tracking a wallet; removes everything it owns.
pub async fn wallet_remove(config: &Config, address: &str) -> Result<()> {
    let store = open_store(config)?;
    if store.remove_wallet(address, LOCAL_USER)? {
        println!("Removed {}", address);
    } else {
        println!("Not tracked: {}", address);
    }
    Ok(())
}

/// List tracked wallets with their cached rollups.
pub async fn wallet_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let wallets = store.list_wallets(LOCAL_USER)?;
    if wallets.is_empty() {
        println!("No wallets tracked. Add one with: walletscope wallet add <address>");
        return Ok(());
    }

    println!(
        "{:<44} {:>10} {:>8} {:>10} {:>8}",
        "ADDRESS", "PNL(SOL)", "WINRATE", "VOL(SOL)", "TRADES"
    );
    for wallet in wallets {
        println!(
            "{:<44} {:>10.3} {:>7.1}% {:>10.2} {:>8}",
            wallet.address,
            wallet.rollups.total_realized_pnl,
            wallet.rollups.win_rate * 100.0,
            wallet.rollups.total_sol_volume,
            wallet.rollups.total_trades,
        );
    }
    Ok(())
}

/// Sync one wallet from the provider.
pub async fn sync(config: &Config, address: &str, force: bool) -> Result<()> {
    let store = open_store(config)?;
    let coordinator = build_coordinator(config, store)?;
    spawn_status_printer(&coordinator);

    let report = coordinator.sync_wallet(address, force).await?;
    println!(
        "Synced {}: {} new transactions, {} new trades ({} malformed skipped)",
        report.wallet, report.new_transactions, report.new_trades, report.skipped_malformed
    );
    println!(
        "Lifetime: {} trades, realized PnL {:.4} SOL, win rate {:.1}%",
        report.total_trades,
        report.rollups.total_realized_pnl,
        report.rollups.win_rate * 100.0
    );
    Ok(())
}

/// Sync every tracked wallet; per-wallet failures are reported, not fatal.
pub async fn sync_all(config: &Config, force: bool) -> Result<()> {
    let store = open_store(config)?;
    let addresses: Vec<String> = store
        .list_wallets(LOCAL_USER)?
        .into_iter()
        .map(|w| w.address)
        .collect();
    if addresses.is_empty() {
        println!("No wallets tracked.");
        return Ok(());
    }

    let coordinator = build_coordinator(config, store)?;
    spawn_status_printer(&coordinator);

    let results = coordinator.sync_all(addresses, force).await;
    let mut failures = 0;
    for (address, result) in results {
        match result {
            Ok(report) => println!(
                "{}: +{} trades (total {})",
                address, report.new_trades, report.total_trades
            ),
            Err(e) => {
                failures += 1;
                println!("{}: FAILED - {}", address, e);
            }
        }
    }
    if failures > 0 {
        warn!("{} wallet(s) failed to sync", failures);
    }
    Ok(())
}

/// List a wallet's trades, optionally from a unix timestamp on.
pub async fn trades(config: &Config, address: &str, since: Option<i64>) -> Result<()> {
    let store = open_store(config)?;
    let trades = store.trades_for_wallet(address, since)?;
    if trades.is_empty() {
        println!("No trades stored for {}", address);
        return Ok(());
    }

    println!(
        "{:<12} {:>5} {:<44} {:>14} {:>10} {:<10}",
        "TIME", "SIDE", "MINT", "TOKENS", "SOL", "DEX"
    );
    for trade in trades {
        println!(
            "{:<12} {:>5} {:<44} {:>14.4} {:>10.4} {:<10}",
            trade.timestamp,
            trade.side.as_str(),
            trade.token_mint,
            trade.token_amount,
            trade.sol_amount,
            trade.dex,
        );
    }
    Ok(())
}

/// Show lifetime positions, rebuilt from the stored trades.
pub async fn positions(config: &Config, address: &str) -> Result<()> {
    let store = open_store(config)?;
    let trades = store.trades_for_wallet(address, None)?;
    let state = recompute_wallet(&store, address, &trades)?;
    if state.positions.is_empty() {
        println!("No positions for {}", address);
        return Ok(());
    }

    println!(
        "{:<44} {:>12} {:>12} {:>10} {:>6}",
        "MINT", "REMAINING", "PNL(SOL)", "AVGPRICE", "WINS"
    );
    for position in &state.positions {
        println!(
            "{:<44} {:>12.4} {:>12.4} {:>10.6} {:>6}",
            position.token_mint,
            position.remaining_tokens,
            position.realized_pnl_sol,
            position.avg_buy_price,
            position.win_count,
        );
    }
    Ok(())
}

/// Period PnL summary. Rebuilds lifetime positions first so the window is
/// priced against lifetime cost basis.
pub async fn summary(config: &Config, address: &str, timeframe: &str) -> Result<()> {
    let timeframe = Timeframe::from_str(timeframe).map_err(Error::Config)?;
    let store = open_store(config)?;
    let trades = store.trades_for_wallet(address, None)?;
    let state = recompute_wallet(&store, address, &trades)?;
    let now = chrono::Utc::now().timestamp();
    let summary = summarize(address, &trades, &state.positions, timeframe, now);

    println!("Summary for {} ({})", summary.wallet, timeframe.as_str());
    println!("  realized PnL: {:.4} SOL", summary.realized_pnl_sol);
    println!("  wins/losses:  {}/{}", summary.win_count, summary.loss_count);
    println!("  volume:       {:.4} SOL over {} trades", summary.total_sol_volume, summary.trade_count);
    println!("  avg size:     {:.4} SOL", summary.avg_trade_size_sol);
    println!("  tokens:       {}", summary.unique_tokens);
    println!("  avg hold:     {:.0}s", summary.avg_hold_duration_secs);
    if let Some(best) = &summary.best_trade {
        println!("  best:  {:+.4} SOL on {}", best.pnl_sol, best.token_mint);
    }
    if let Some(worst) = &summary.worst_trade {
        println!("  worst: {:+.4} SOL on {}", worst.pnl_sol, worst.token_mint);
    }
    Ok(())
}

/// Behavioral profile from cached trades and the launch table.
pub async fn profile(config: &Config, address: &str) -> Result<()> {
    let store = open_store(config)?;
    let trades = store.trades_for_wallet(address, None)?;
    store.refresh_token_launches()?;
    let launches = store.token_launches()?;
    let profile = build_profile(address, &trades, &launches);

    println!("Profile for {}", profile.wallet);
    println!("  tokens tracked: {}", profile.tokens_tracked);
    println!("  trades:         {}", profile.total_trades);
    println!("  volume:         {:.4} SOL", profile.total_sol_volume);
    println!(
        "  entry latency:  p50 {:.0}s / p90 {:.0}s ({} samples)",
        profile.entry_latency_secs.p50,
        profile.entry_latency_secs.p90,
        profile.entry_latency_secs.samples
    );
    println!(
        "  hold duration:  p50 {:.0}s / p90 {:.0}s ({} samples)",
        profile.hold_duration_secs.p50,
        profile.hold_duration_secs.p90,
        profile.hold_duration_secs.samples
    );
    println!("  early exits:    {:.1}%", profile.early_exit_rate * 100.0);
    println!("  round trips:    {:.1}%", profile.round_trip_rate * 100.0);
    let mut dexes: Vec<_> = profile.dex_breakdown.iter().collect();
    dexes.sort_by(|a, b| b.1.cmp(a.1));
    for (dex, count) in dexes {
        println!("  {:<14} {}", dex, count);
    }
    Ok(())
}

/// Copy-trade simulation; persists the resulting score row.
pub async fn simulate(
    config: &Config,
    address: &str,
    delay_seconds: Option<u32>,
    model: Option<&str>,
) -> Result<()> {
    let params = FollowParams {
        delay_seconds: delay_seconds.unwrap_or(config.follow.delay_seconds),
        model: model
            .unwrap_or(&config.follow.slippage_model)
            .parse::<SlippageModel>()
            .map_err(Error::Config)?,
    };

    let store = open_store(config)?;
    let trades = store.trades_for_wallet(address, None)?;
    let now = chrono::Utc::now().timestamp();
    let report = simulate_wallet(address, &trades, &params, now);
    store.upsert_follow_score(&report.score)?;

    let score = &report.score;
    println!(
        "Simulation for {} (delay {}s, {} slippage)",
        score.wallet, score.delay_seconds, score.slippage_model
    );
    println!("  actual PnL:     {:.4} SOL", score.actual_pnl_sol);
    println!("  simulated PnL:  {:.4} SOL", score.simulated_pnl_sol);
    println!("  ratio:          {:.3}", score.followability_ratio);
    println!("  quick dumps:    {:.1}%", score.quick_dump_rate * 100.0);
    println!(
        "  first sell:     avg {:.0}s / median {:.0}s",
        score.avg_time_to_first_sell_secs, score.median_time_to_first_sell_secs
    );
    println!(
        "  followable:     {} of {} round-trip tokens",
        score.followable_tokens,
        score.followable_tokens + score.unfollowable_tokens
    );
    println!("  avg entry:      {:.4} SOL", score.avg_entry_size_sol);
    Ok(())
}

/// Show current configuration (secrets masked).
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
