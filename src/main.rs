//! Walletscope - swap analytics for tracked Solana wallets
//!
//! Ingests enhanced transaction history for a catalog of wallets, rebuilds
//! realized PnL under FIFO cost basis, and scores how copyable each wallet
//! would be for a delayed follower.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use walletscope::cli::commands;
use walletscope::config::Config;

/// Walletscope - wallet swap analytics and copy-trade scoring
#[derive(Parser)]
#[command(name = "walletscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "walletscope.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet catalog management
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Sync one wallet's transaction history
    Sync {
        /// Wallet address
        address: String,

        /// Reprocess the full history instead of stopping at the cursor
        #[arg(long)]
        force: bool,
    },

    /// Sync every tracked wallet
    SyncAll {
        /// Reprocess full histories
        #[arg(long)]
        force: bool,
    },

    /// List stored trades for a wallet
    Trades {
        /// Wallet address
        address: String,

        /// Only trades at or after this unix timestamp
        #[arg(long)]
        since: Option<i64>,
    },

    /// Show lifetime positions for a wallet
    Positions {
        /// Wallet address
        address: String,
    },

    /// Period PnL summary for a wallet
    Summary {
        /// Wallet address
        address: String,

        /// Timeframe: 24h, 7d, 30d, 90d or all
        #[arg(long, default_value = "all")]
        timeframe: String,
    },

    /// Behavioral profile for a wallet
    Profile {
        /// Wallet address
        address: String,
    },

    /// Copy-trade simulation for a wallet
    Simulate {
        /// Wallet address
        address: String,

        /// Copy delay in seconds
        #[arg(long)]
        delay: Option<u32>,

        /// Slippage model: conservative, moderate, aggressive
        #[arg(long)]
        model: Option<String>,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Track a new wallet
    Add {
        /// Wallet address
        address: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Display emoji
        #[arg(long)]
        emoji: Option<String>,
    },

    /// Stop tracking a wallet (removes its stored data)
    Remove {
        /// Wallet address
        address: String,
    },

    /// List tracked wallets
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("walletscope=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Wallet { action } => match action {
            WalletAction::Add { address, name, emoji } => {
                commands::wallet_add(&config, &address, name.as_deref(), emoji.as_deref()).await
            }
            WalletAction::Remove { address } => commands::wallet_remove(&config, &address).await,
            WalletAction::List => commands::wallet_list(&config).await,
        },
        Commands::Sync { address, force } => commands::sync(&config, &address, force).await,
        Commands::SyncAll { force } => commands::sync_all(&config, force).await,
        Commands::Trades { address, since } => commands::trades(&config, &address, since).await,
        Commands::Positions { address } => commands::positions(&config, &address).await,
        Commands::Summary { address, timeframe } => {
            commands::summary(&config, &address, &timeframe).await
        }
        Commands::Profile { address } => commands::profile(&config, &address).await,
        Commands::Simulate {
            address,
            delay,
            model,
        } => commands::simulate(&config, &address, delay, model.as_deref()).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
