//! Token metadata cache and the materialized launch table.

use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use tracing::debug;

use super::Store;
use crate::error::Result;
use crate::model::{TokenLaunch, TokenMetadata};

const LAUNCHES_RAW_COUNT_KEY: &str = "launches_raw_count";

impl Store {
    pub fn upsert_token_metadata(&self, metadata: &TokenMetadata) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO token_metadata (mint, symbol, name, decimals, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                metadata.mint,
                metadata.symbol,
                metadata.name,
                metadata.decimals,
                metadata.last_updated,
            ],
        )?;
        Ok(())
    }

    pub fn get_token_metadata(&self, mint: &str) -> Result<Option<TokenMetadata>> {
        let conn = self.conn.lock().unwrap();
        let metadata = conn
            .query_row(
                "SELECT mint, symbol, name, decimals, last_updated
                 FROM token_metadata WHERE mint = ?1",
                params![mint],
                |row| {
                    Ok(TokenMetadata {
                        mint: row.get(0)?,
                        symbol: row.get(1)?,
                        name: row.get(2)?,
                        decimals: row.get(3)?,
                        last_updated: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(metadata)
    }

    pub fn delete_token_metadata(&self, mint: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM token_metadata WHERE mint = ?1",
            params![mint],
        )?;
        Ok(deleted > 0)
    }

    /// Rebuild the launch table (earliest observation per mint across all
    /// stored raw transactions) when the raw-transaction set changed since
    /// the last build. Returns true when a rebuild happened.
    pub fn refresh_token_launches(&self) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();

        let raw_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        let cached: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![LAUNCHES_RAW_COUNT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        if cached.as_deref() == Some(raw_count.to_string().as_str()) {
            return Ok(false);
        }

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM token_launches", [])?;
        // SQLite resolves the bare columns from the row that achieves
        // MIN(block_time) within each group.
        tx.execute(
            "INSERT INTO token_launches (mint, signature, first_timestamp, slot)
             SELECT t.token_mint, tx.signature, MIN(tx.block_time), tx.slot
             FROM trades t
             JOIN transactions tx ON tx.signature = t.signature
             GROUP BY t.token_mint",
            [],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![LAUNCHES_RAW_COUNT_KEY, raw_count.to_string()],
        )?;
        tx.commit()?;

        debug!(raw_count, "Token launch table rebuilt");
        Ok(true)
    }

    /// All known launches keyed by mint.
    pub fn token_launches(&self) -> Result<HashMap<String, TokenLaunch>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT mint, signature, first_timestamp, slot FROM token_launches")?;
        let launches = stmt
            .query_map([], |row| {
                Ok(TokenLaunch {
                    mint: row.get(0)?,
                    signature: row.get(1)?,
                    first_timestamp: row.get(2)?,
                    slot: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(launches
            .into_iter()
            .map(|launch| (launch.mint.clone(), launch))
            .collect())
    }
}
