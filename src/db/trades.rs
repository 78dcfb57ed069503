//! Trade rows and the atomic sync commit.

use rusqlite::{params, Row};
use std::str::FromStr;
use tracing::debug;

use super::{Store, SyncBatch};
use crate::error::{Error, Result};
use crate::model::{Trade, TradeSide};

/// Outcome of one committed sync batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncCommit {
    pub new_transactions: u32,
    pub new_trades: u32,
}

fn trade_from_row(row: &Row) -> rusqlite::Result<Trade> {
    let side_str: String = row.get("side")?;
    let side = TradeSide::from_str(&side_str).unwrap_or(TradeSide::Buy);
    Ok(Trade {
        id: row.get("id")?,
        wallet: row.get("wallet")?,
        signature: row.get("signature")?,
        timestamp: row.get("timestamp")?,
        side,
        token_mint: row.get("token_mint")?,
        token_amount: row.get("token_amount")?,
        sol_amount: row.get("sol_amount")?,
        price_per_token: row.get("price_per_token")?,
        dex: row.get("dex")?,
    })
}

impl Store {
    /// Upsert a trade; the deterministic id makes replays replace rather
    /// than duplicate.
    pub fn upsert_trade(&self, trade: &Trade) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO trades
             (id, wallet, signature, timestamp, side, token_mint,
              token_amount, sol_amount, price_per_token, dex)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                trade.id,
                trade.wallet,
                trade.signature,
                trade.timestamp,
                trade.side.as_str(),
                trade.token_mint,
                trade.token_amount,
                trade.sol_amount,
                trade.price_per_token,
                trade.dex,
            ],
        )?;
        Ok(())
    }

    /// Trades for a wallet ordered by time, optionally from `since` on.
    pub fn trades_for_wallet(&self, wallet: &str, since: Option<i64>) -> Result<Vec<Trade>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM trades
             WHERE wallet = ?1 AND timestamp >= ?2
             ORDER BY timestamp ASC, id ASC",
        )?;
        let trades = stmt
            .query_map(params![wallet, since.unwrap_or(0)], trade_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trades)
    }

    /// Commit one sync batch atomically: advance the wallet cursor, insert
    /// raw transactions (idempotent), upsert the parsed trades and flip the
    /// parsed flags. Either every row lands or none does.
    pub fn commit_sync_batch(&self, batch: &SyncBatch<'_>) -> Result<SyncCommit> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![batch.user_id, batch.now],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO wallets (address, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![batch.wallet, batch.user_id, batch.now],
        )?;

        let mut commit = SyncCommit::default();
        for raw in batch.raw {
            if raw.wallet != batch.wallet {
                return Err(Error::StoreConflict(format!(
                    "raw transaction {} belongs to {}, not {}",
                    raw.signature, raw.wallet, batch.wallet
                )));
            }
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO transactions
                 (signature, wallet, block_time, slot, payload, parsed)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![raw.signature, raw.wallet, raw.block_time, raw.slot, raw.payload],
            )?;
            commit.new_transactions += inserted as u32;
        }

        for trade in batch.trades {
            let inserted = tx.execute(
                "INSERT OR REPLACE INTO trades
                 (id, wallet, signature, timestamp, side, token_mint,
                  token_amount, sol_amount, price_per_token, dex)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    trade.id,
                    trade.wallet,
                    trade.signature,
                    trade.timestamp,
                    trade.side.as_str(),
                    trade.token_mint,
                    trade.token_amount,
                    trade.sol_amount,
                    trade.price_per_token,
                    trade.dex,
                ],
            )?;
            commit.new_trades += inserted as u32;
        }

        for raw in batch.raw {
            tx.execute(
                "UPDATE transactions SET parsed = 1 WHERE signature = ?1",
                params![raw.signature],
            )?;
        }

        tx.execute(
            "UPDATE wallets SET
                last_synced_at = ?1,
                last_signature = COALESCE(?2, last_signature),
                first_synced_at = COALESCE(first_synced_at, ?3),
                total_transactions = total_transactions + ?4
             WHERE address = ?5 AND user_id = ?6",
            params![
                batch.now,
                batch.newest_signature,
                batch.earliest_timestamp,
                commit.new_transactions,
                batch.wallet,
                batch.user_id,
            ],
        )?;

        tx.commit()?;
        debug!(
            wallet = %batch.wallet,
            new_transactions = commit.new_transactions,
            new_trades = commit.new_trades,
            "Sync batch committed"
        );
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTransaction;

    fn raw(signature: &str, block_time: i64) -> RawTransaction {
        RawTransaction {
            signature: signature.to_string(),
            wallet: "Wa11et".to_string(),
            block_time,
            slot: block_time as u64,
            payload: "{}".to_string(),
            parsed: false,
        }
    }

    fn batch_trades() -> Vec<Trade> {
        vec![
            Trade::new("Wa11et", "sig1", 100, TradeSide::Buy, "MintA", 1000.0, 1.0, "Jupiter"),
            Trade::new("Wa11et", "sig2", 200, TradeSide::Sell, "MintA", 1000.0, 1.5, "Jupiter"),
        ]
    }

    #[test]
    fn test_commit_sync_batch_writes_everything() {
        let store = Store::open_in_memory().unwrap();
        let raws = vec![raw("sig1", 100), raw("sig2", 200)];
        let trades = batch_trades();
        let commit = store
            .commit_sync_batch(&SyncBatch {
                wallet: "Wa11et",
                user_id: "local",
                now: 300,
                newest_signature: Some("sig2"),
                earliest_timestamp: Some(100),
                raw: &raws,
                trades: &trades,
            })
            .unwrap();

        assert_eq!(commit.new_transactions, 2);
        assert_eq!(commit.new_trades, 2);

        let wallet = store.get_wallet("Wa11et", "local").unwrap().unwrap();
        assert_eq!(wallet.last_signature.as_deref(), Some("sig2"));
        assert_eq!(wallet.first_synced_at, Some(100));
        assert_eq!(wallet.last_synced_at, Some(300));
        assert_eq!(wallet.total_transactions, 2);

        let stored = store.trades_for_wallet("Wa11et", None).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].side, TradeSide::Buy);
    }

    #[test]
    fn test_commit_sync_batch_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let raws = vec![raw("sig1", 100), raw("sig2", 200)];
        let trades = batch_trades();
        let batch = SyncBatch {
            wallet: "Wa11et",
            user_id: "local",
            now: 300,
            newest_signature: Some("sig2"),
            earliest_timestamp: Some(100),
            raw: &raws,
            trades: &trades,
        };
        store.commit_sync_batch(&batch).unwrap();
        let second = store.commit_sync_batch(&batch).unwrap();

        // Raw rows are write-once; trades replace on their deterministic id.
        assert_eq!(second.new_transactions, 0);
        assert_eq!(store.trades_for_wallet("Wa11et", None).unwrap().len(), 2);
        let wallet = store.get_wallet("Wa11et", "local").unwrap().unwrap();
        assert_eq!(wallet.total_transactions, 2);
        // first_synced_at is seeded once and never moves.
        assert_eq!(wallet.first_synced_at, Some(100));
    }

    #[test]
    fn test_commit_rejects_foreign_rows() {
        let store = Store::open_in_memory().unwrap();
        let mut stray = raw("sig9", 100);
        stray.wallet = "SomeoneE1se".to_string();
        let raws = vec![stray];
        let err = store
            .commit_sync_batch(&SyncBatch {
                wallet: "Wa11et",
                user_id: "local",
                now: 300,
                newest_signature: None,
                earliest_timestamp: None,
                raw: &raws,
                trades: &[],
            })
            .unwrap_err();
        assert!(matches!(err, Error::StoreConflict(_)));
        // Nothing from the aborted batch is visible.
        assert_eq!(store.raw_transaction_count().unwrap(), 0);
        assert!(store.get_wallet("Wa11et", "local").unwrap().is_none());
    }

    #[test]
    fn test_trades_since_filter() {
        let store = Store::open_in_memory().unwrap();
        for trade in batch_trades() {
            store.upsert_trade(&trade).unwrap();
        }
        let recent = store.trades_for_wallet("Wa11et", Some(150)).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].side, TradeSide::Sell);
    }
}
