//! Follow-score rows: one simulation result per wallet.

use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::Result;
use crate::model::FollowScore;

fn score_from_row(row: &Row) -> rusqlite::Result<FollowScore> {
    Ok(FollowScore {
        wallet: row.get("wallet")?,
        delay_seconds: row.get("delay_seconds")?,
        slippage_model: row.get("slippage_model")?,
        actual_pnl_sol: row.get("actual_pnl_sol")?,
        simulated_pnl_sol: row.get("simulated_pnl_sol")?,
        followability_ratio: row.get("followability_ratio")?,
        quick_dump_rate: row.get("quick_dump_rate")?,
        avg_time_to_first_sell_secs: row.get("avg_time_to_first_sell_secs")?,
        median_time_to_first_sell_secs: row.get("median_time_to_first_sell_secs")?,
        followable_tokens: row.get("followable_tokens")?,
        unfollowable_tokens: row.get("unfollowable_tokens")?,
        avg_entry_size_sol: row.get("avg_entry_size_sol")?,
        computed_at: row.get("computed_at")?,
    })
}

impl Store {
    pub fn upsert_follow_score(&self, score: &FollowScore) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO wallet_follow_scores
             (wallet, delay_seconds, slippage_model, actual_pnl_sol, simulated_pnl_sol,
              followability_ratio, quick_dump_rate, avg_time_to_first_sell_secs,
              median_time_to_first_sell_secs, followable_tokens, unfollowable_tokens,
              avg_entry_size_sol, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                score.wallet,
                score.delay_seconds,
                score.slippage_model,
                score.actual_pnl_sol,
                score.simulated_pnl_sol,
                score.followability_ratio,
                score.quick_dump_rate,
                score.avg_time_to_first_sell_secs,
                score.median_time_to_first_sell_secs,
                score.followable_tokens,
                score.unfollowable_tokens,
                score.avg_entry_size_sol,
                score.computed_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_follow_score(&self, wallet: &str) -> Result<Option<FollowScore>> {
        let conn = self.conn.lock().unwrap();
        let score = conn
            .query_row(
                "SELECT * FROM wallet_follow_scores WHERE wallet = ?1",
                params![wallet],
                score_from_row,
            )
            .optional()?;
        Ok(score)
    }
}
