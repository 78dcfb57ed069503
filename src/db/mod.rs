//! Persistence adapter
//!
//! Typed access to the local SQLite store. One connection behind a mutex;
//! WAL keeps readers unblocked while the sync coordinator writes.
//! Multi-statement writes (sync commits, FIFO rebuilds, cascade deletes)
//! run inside a single transaction: either everything lands or nothing.

pub mod positions;
pub mod scores;
pub mod tokens;
pub mod trades;
pub mod transactions;
pub mod wallets;

use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::model::{RawTransaction, Trade};

pub use trades::SyncCommit;

/// Input to one atomic sync commit (§ step 4 of a run): wallet cursor
/// advance, raw transactions and the trades parsed from them.
#[derive(Debug)]
pub struct SyncBatch<'a> {
    pub wallet: &'a str,
    pub user_id: &'a str,
    pub now: i64,
    /// Newest signature observed this run; becomes the wallet cursor
    pub newest_signature: Option<&'a str>,
    /// Earliest block time in the batch; seeds first_synced_at once
    pub earliest_timestamp: Option<i64>,
    pub raw: &'a [RawTransaction],
    pub trades: &'a [Trade],
}

/// Main store wrapper
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at `path`, applying schema, migrations
    /// and one-shot backfills.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(&config.path)
            .with_context(|| format!("Failed to open database: {}", config.path))?;

        if config.wal {
            conn.execute_batch("PRAGMA journal_mode=WAL;")
                .context("Failed to enable WAL mode")?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to enable foreign keys")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!(path = %config.path, wal = config.wal, "Store opened");
        Ok(store)
    }

    /// In-memory store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to enable foreign keys")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::init_schema(&conn)?;
        Self::run_migrations(&conn)?;
        Self::run_backfills(&conn)?;
        Ok(())
    }

    /// Base schema. Columns added after the initial release live in
    /// `run_migrations`, not here.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wallets (
                address TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id),
                name TEXT,
                emoji TEXT,
                alerts_on INTEGER NOT NULL DEFAULT 0,
                last_synced_at INTEGER,
                last_signature TEXT,
                total_transactions INTEGER NOT NULL DEFAULT 0,
                total_realized_pnl REAL NOT NULL DEFAULT 0.0,
                win_rate REAL NOT NULL DEFAULT 0.0,
                total_sol_volume REAL NOT NULL DEFAULT 0.0,
                total_trades INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (address, user_id)
            );

            CREATE TABLE IF NOT EXISTS transactions (
                signature TEXT PRIMARY KEY,
                wallet TEXT NOT NULL,
                block_time INTEGER NOT NULL,
                slot INTEGER NOT NULL,
                payload TEXT NOT NULL,
                parsed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                wallet TEXT NOT NULL,
                signature TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                side TEXT CHECK(side IN ('buy', 'sell')) NOT NULL,
                token_mint TEXT NOT NULL,
                token_amount REAL NOT NULL,
                sol_amount REAL NOT NULL,
                price_per_token REAL NOT NULL,
                dex TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS positions (
                wallet TEXT NOT NULL,
                token_mint TEXT NOT NULL,
                total_bought REAL NOT NULL DEFAULT 0.0,
                total_sold REAL NOT NULL DEFAULT 0.0,
                total_cost_sol REAL NOT NULL DEFAULT 0.0,
                total_proceeds_sol REAL NOT NULL DEFAULT 0.0,
                remaining_tokens REAL NOT NULL DEFAULT 0.0,
                avg_buy_price REAL NOT NULL DEFAULT 0.0,
                realized_pnl_sol REAL NOT NULL DEFAULT 0.0,
                trade_count INTEGER NOT NULL DEFAULT 0,
                win_count INTEGER NOT NULL DEFAULT 0,
                first_trade_at INTEGER NOT NULL DEFAULT 0,
                last_trade_at INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (wallet, token_mint)
            );

            CREATE TABLE IF NOT EXISTS cost_basis_lots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wallet TEXT NOT NULL,
                token_mint TEXT NOT NULL,
                trade_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                original_amount REAL NOT NULL,
                remaining_amount REAL NOT NULL,
                price_per_token REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS token_metadata (
                mint TEXT PRIMARY KEY,
                symbol TEXT,
                name TEXT,
                decimals INTEGER,
                last_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS token_launches (
                mint TEXT PRIMARY KEY,
                signature TEXT NOT NULL,
                first_timestamp INTEGER NOT NULL,
                slot INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wallet_follow_scores (
                wallet TEXT PRIMARY KEY,
                delay_seconds INTEGER NOT NULL,
                slippage_model TEXT NOT NULL,
                actual_pnl_sol REAL NOT NULL,
                simulated_pnl_sol REAL NOT NULL,
                followability_ratio REAL NOT NULL,
                quick_dump_rate REAL NOT NULL,
                avg_time_to_first_sell_secs REAL NOT NULL,
                median_time_to_first_sell_secs REAL NOT NULL,
                followable_tokens INTEGER NOT NULL,
                unfollowable_tokens INTEGER NOT NULL,
                avg_entry_size_sol REAL NOT NULL,
                computed_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_wallet ON transactions(wallet, block_time);
            CREATE INDEX IF NOT EXISTS idx_trades_wallet_time ON trades(wallet, timestamp);
            CREATE INDEX IF NOT EXISTS idx_trades_wallet_mint ON trades(wallet, token_mint);
            CREATE INDEX IF NOT EXISTS idx_lots_wallet_mint ON cost_basis_lots(wallet, token_mint, timestamp);
            "#,
        )
        .context("Failed to initialize database schema")?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Additive, idempotent migrations: probe for the column, add it only
    /// when missing.
    fn run_migrations(conn: &Connection) -> Result<()> {
        if !Self::has_column(conn, "wallets", "first_synced_at")? {
            conn.execute("ALTER TABLE wallets ADD COLUMN first_synced_at INTEGER", [])?;
            info!("Migration: added wallets.first_synced_at");
        }
        if !Self::has_column(conn, "wallets", "quick_flip_rate")? {
            conn.execute(
                "ALTER TABLE wallets ADD COLUMN quick_flip_rate REAL NOT NULL DEFAULT 0.0",
                [],
            )?;
            info!("Migration: added wallets.quick_flip_rate");
        }
        if !Self::has_column(conn, "wallets", "exited_token_rate")? {
            conn.execute(
                "ALTER TABLE wallets ADD COLUMN exited_token_rate REAL NOT NULL DEFAULT 0.0",
                [],
            )?;
            info!("Migration: added wallets.exited_token_rate");
        }
        Ok(())
    }

    /// One-shot backfills for rows that predate a migration.
    fn run_backfills(conn: &Connection) -> Result<()> {
        // Wallets synced before first_synced_at existed inherit the block
        // time of their earliest stored transaction.
        conn.execute(
            "UPDATE wallets
             SET first_synced_at = (
                 SELECT MIN(block_time) FROM transactions
                 WHERE transactions.wallet = wallets.address
             )
             WHERE first_synced_at IS NULL
               AND EXISTS (
                 SELECT 1 FROM transactions WHERE transactions.wallet = wallets.address
               )",
            [],
        )?;
        Ok(())
    }

    fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
