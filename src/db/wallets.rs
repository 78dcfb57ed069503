//! Wallet rows: metadata, cursor, cached rollups, cascade removal.

use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::Store;
use crate::error::Result;
use crate::model::{TrackedWallet, WalletRollups};

fn wallet_from_row(row: &Row) -> rusqlite::Result<TrackedWallet> {
    Ok(TrackedWallet {
        address: row.get("address")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        emoji: row.get("emoji")?,
        alerts_on: row.get::<_, i64>("alerts_on")? != 0,
        last_synced_at: row.get("last_synced_at")?,
        first_synced_at: row.get("first_synced_at")?,
        last_signature: row.get("last_signature")?,
        total_transactions: row.get("total_transactions")?,
        rollups: WalletRollups {
            total_realized_pnl: row.get("total_realized_pnl")?,
            win_rate: row.get("win_rate")?,
            total_sol_volume: row.get("total_sol_volume")?,
            total_trades: row.get("total_trades")?,
            quick_flip_rate: row.get("quick_flip_rate")?,
            exited_token_rate: row.get("exited_token_rate")?,
        },
        created_at: row.get("created_at")?,
    })
}

impl Store {
    /// Create the user row if missing.
    pub fn ensure_user(&self, user_id: &str, now: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![user_id, now],
        )?;
        Ok(())
    }

    /// Add a wallet to the catalog (no-op if already tracked) and return
    /// its current row.
    pub fn add_wallet(
        &self,
        address: &str,
        user_id: &str,
        name: Option<&str>,
        emoji: Option<&str>,
        now: i64,
    ) -> Result<TrackedWallet> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
                params![user_id, now],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO wallets (address, user_id, name, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![address, user_id, name, emoji, now],
            )?;
        }
        info!(wallet = %address, "Wallet tracked");
        self.get_wallet(address, user_id)?
            .ok_or_else(|| crate::error::Error::WalletNotFound(address.to_string()))
    }

    /// Update display metadata for a tracked wallet.
    pub fn update_wallet_meta(
        &self,
        address: &str,
        user_id: &str,
        name: Option<&str>,
        emoji: Option<&str>,
        alerts_on: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET name = ?1, emoji = ?2, alerts_on = ?3
             WHERE address = ?4 AND user_id = ?5",
            params![name, emoji, alerts_on as i64, address, user_id],
        )?;
        Ok(())
    }

    pub fn get_wallet(&self, address: &str, user_id: &str) -> Result<Option<TrackedWallet>> {
        let conn = self.conn.lock().unwrap();
        let wallet = conn
            .query_row(
                "SELECT * FROM wallets WHERE address = ?1 AND user_id = ?2",
                params![address, user_id],
                wallet_from_row,
            )
            .optional()?;
        Ok(wallet)
    }

    pub fn list_wallets(&self, user_id: &str) -> Result<Vec<TrackedWallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM wallets WHERE user_id = ?1 ORDER BY created_at")?;
        let wallets = stmt
            .query_map(params![user_id], wallet_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(wallets)
    }

    /// Write cached rollups. Called only after the corresponding trade set
    /// is fully persisted, so readers never see rollups ahead of trades.
    pub fn update_wallet_rollups(
        &self,
        address: &str,
        user_id: &str,
        rollups: &WalletRollups,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET
                total_realized_pnl = ?1,
                win_rate = ?2,
                total_sol_volume = ?3,
                total_trades = ?4,
                quick_flip_rate = ?5,
                exited_token_rate = ?6
             WHERE address = ?7 AND user_id = ?8",
            params![
                rollups.total_realized_pnl,
                rollups.win_rate,
                rollups.total_sol_volume,
                rollups.total_trades,
                rollups.quick_flip_rate,
                rollups.exited_token_rate,
                address,
                user_id,
            ],
        )?;
        debug!(wallet = %address, "Rollups updated");
        Ok(())
    }

    /// Remove a wallet and everything it owns: trades, positions, lots,
    /// raw transactions and its follow score, in one transaction.
    pub fn remove_wallet(&self, address: &str, user_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM wallets WHERE address = ?1 AND user_id = ?2",
            params![address, user_id],
        )?;
        if removed > 0 {
            tx.execute("DELETE FROM trades WHERE wallet = ?1", params![address])?;
            tx.execute("DELETE FROM positions WHERE wallet = ?1", params![address])?;
            tx.execute(
                "DELETE FROM cost_basis_lots WHERE wallet = ?1",
                params![address],
            )?;
            tx.execute(
                "DELETE FROM transactions WHERE wallet = ?1",
                params![address],
            )?;
            tx.execute(
                "DELETE FROM wallet_follow_scores WHERE wallet = ?1",
                params![address],
            )?;
        }
        tx.commit()?;
        if removed > 0 {
            info!(wallet = %address, "Wallet removed with owned rows");
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawTransaction, Trade, TradeSide};

    #[test]
    fn test_add_and_get_wallet() {
        let store = Store::open_in_memory().unwrap();
        let wallet = store
            .add_wallet("Wa11et", "local", Some("degen"), Some("🐸"), 1000)
            .unwrap();
        assert_eq!(wallet.address, "Wa11et");
        assert_eq!(wallet.name.as_deref(), Some("degen"));
        assert_eq!(wallet.total_transactions, 0);
        assert!(wallet.last_signature.is_none());

        // Adding again is a no-op, not a duplicate.
        let again = store.add_wallet("Wa11et", "local", None, None, 2000).unwrap();
        assert_eq!(again.created_at, 1000);
        assert_eq!(store.list_wallets("local").unwrap().len(), 1);
    }

    #[test]
    fn test_rollups_round_trip() {
        let store = Store::open_in_memory().unwrap();
        store.add_wallet("Wa11et", "local", None, None, 0).unwrap();
        let rollups = WalletRollups {
            total_realized_pnl: 12.5,
            win_rate: 0.6,
            total_sol_volume: 420.0,
            total_trades: 37,
            quick_flip_rate: 0.25,
            exited_token_rate: 0.8,
        };
        store
            .update_wallet_rollups("Wa11et", "local", &rollups)
            .unwrap();
        let wallet = store.get_wallet("Wa11et", "local").unwrap().unwrap();
        assert!((wallet.rollups.total_realized_pnl - 12.5).abs() < 1e-9);
        assert_eq!(wallet.rollups.total_trades, 37);
        assert!((wallet.rollups.exited_token_rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_remove_wallet_cascades() {
        let store = Store::open_in_memory().unwrap();
        store.add_wallet("Wa11et", "local", None, None, 0).unwrap();

        let raw = RawTransaction {
            signature: "sig1".into(),
            wallet: "Wa11et".into(),
            block_time: 100,
            slot: 1,
            payload: "{}".into(),
            parsed: false,
        };
        store.insert_raw_transaction(&raw).unwrap();
        let trade = Trade::new("Wa11et", "sig1", 100, TradeSide::Buy, "MintA", 10.0, 1.0, "Orca");
        store.upsert_trade(&trade).unwrap();

        assert!(store.remove_wallet("Wa11et", "local").unwrap());
        assert!(store.get_wallet("Wa11et", "local").unwrap().is_none());
        assert!(store.trades_for_wallet("Wa11et", None).unwrap().is_empty());
        assert_eq!(store.raw_transaction_count().unwrap(), 0);

        // Removing a wallet that is not tracked reports false.
        assert!(!store.remove_wallet("Wa11et", "local").unwrap());
    }
}
