//! Raw transaction rows: write-once content, mutable parsed flag.

use rusqlite::{params, OptionalExtension};

use super::Store;
use crate::error::Result;
use crate::model::RawTransaction;

impl Store {
    /// Insert a raw transaction; idempotent on signature. Returns true if
    /// the row is new.
    pub fn insert_raw_transaction(&self, raw: &RawTransaction) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO transactions (signature, wallet, block_time, slot, payload, parsed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                raw.signature,
                raw.wallet,
                raw.block_time,
                raw.slot,
                raw.payload,
                raw.parsed as i64,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Flip the parsed flag after the record's trades have been extracted.
    pub fn mark_parsed(&self, signature: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE transactions SET parsed = 1 WHERE signature = ?1",
            params![signature],
        )?;
        Ok(())
    }

    /// Newest stored signature for a wallet by chain order.
    pub fn latest_signature(&self, wallet: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let signature = conn
            .query_row(
                "SELECT signature FROM transactions WHERE wallet = ?1
                 ORDER BY block_time DESC, slot DESC LIMIT 1",
                params![wallet],
                |row| row.get(0),
            )
            .optional()?;
        Ok(signature)
    }

    pub fn raw_transaction_count(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn raw_transaction_count_for_wallet(&self, wallet: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE wallet = ?1",
            params![wallet],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(signature: &str, block_time: i64, slot: u64) -> RawTransaction {
        RawTransaction {
            signature: signature.to_string(),
            wallet: "Wa11et".to_string(),
            block_time,
            slot,
            payload: "{}".to_string(),
            parsed: false,
        }
    }

    #[test]
    fn test_insert_is_idempotent_on_signature() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.insert_raw_transaction(&raw("sig1", 100, 1)).unwrap());
        assert!(!store.insert_raw_transaction(&raw("sig1", 999, 9)).unwrap());
        assert_eq!(store.raw_transaction_count().unwrap(), 1);
    }

    #[test]
    fn test_latest_signature_follows_chain_order() {
        let store = Store::open_in_memory().unwrap();
        store.insert_raw_transaction(&raw("old", 100, 1)).unwrap();
        store.insert_raw_transaction(&raw("new", 200, 2)).unwrap();
        assert_eq!(
            store.latest_signature("Wa11et").unwrap().as_deref(),
            Some("new")
        );
        assert!(store.latest_signature("unknown").unwrap().is_none());
    }

    #[test]
    fn test_mark_parsed() {
        let store = Store::open_in_memory().unwrap();
        store.insert_raw_transaction(&raw("sig1", 100, 1)).unwrap();
        store.mark_parsed("sig1").unwrap();
        let conn = store.conn.lock().unwrap();
        let parsed: i64 = conn
            .query_row(
                "SELECT parsed FROM transactions WHERE signature = 'sig1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(parsed, 1);
    }
}
