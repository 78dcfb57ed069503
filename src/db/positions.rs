//! Position and cost-basis lot rows. The FIFO engine replaces a wallet's
//! entire state in one transaction; nothing here is patched in place.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::Store;
use crate::error::Result;
use crate::model::{CostBasisLot, Position};

fn position_from_row(row: &Row) -> rusqlite::Result<Position> {
    Ok(Position {
        wallet: row.get("wallet")?,
        token_mint: row.get("token_mint")?,
        total_bought: row.get("total_bought")?,
        total_sold: row.get("total_sold")?,
        total_cost_sol: row.get("total_cost_sol")?,
        total_proceeds_sol: row.get("total_proceeds_sol")?,
        remaining_tokens: row.get("remaining_tokens")?,
        avg_buy_price: row.get("avg_buy_price")?,
        realized_pnl_sol: row.get("realized_pnl_sol")?,
        trade_count: row.get("trade_count")?,
        win_count: row.get("win_count")?,
        first_trade_at: row.get("first_trade_at")?,
        last_trade_at: row.get("last_trade_at")?,
    })
}

fn lot_from_row(row: &Row) -> rusqlite::Result<CostBasisLot> {
    Ok(CostBasisLot {
        wallet: row.get("wallet")?,
        token_mint: row.get("token_mint")?,
        trade_id: row.get("trade_id")?,
        timestamp: row.get("timestamp")?,
        original_amount: row.get("original_amount")?,
        remaining_amount: row.get("remaining_amount")?,
        price_per_token: row.get("price_per_token")?,
    })
}

impl Store {
    /// Atomically swap in the freshly computed FIFO state for a wallet:
    /// existing positions and lots go, the new set lands, or neither.
    pub fn replace_fifo_state(
        &self,
        wallet: &str,
        positions: &[Position],
        lots: &[CostBasisLot],
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM positions WHERE wallet = ?1", params![wallet])?;
        tx.execute(
            "DELETE FROM cost_basis_lots WHERE wallet = ?1",
            params![wallet],
        )?;

        for position in positions {
            tx.execute(
                "INSERT INTO positions
                 (wallet, token_mint, total_bought, total_sold, total_cost_sol,
                  total_proceeds_sol, remaining_tokens, avg_buy_price,
                  realized_pnl_sol, trade_count, win_count, first_trade_at, last_trade_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    position.wallet,
                    position.token_mint,
                    position.total_bought,
                    position.total_sold,
                    position.total_cost_sol,
                    position.total_proceeds_sol,
                    position.remaining_tokens,
                    position.avg_buy_price,
                    position.realized_pnl_sol,
                    position.trade_count,
                    position.win_count,
                    position.first_trade_at,
                    position.last_trade_at,
                ],
            )?;
        }

        // Only open lots survive; fully consumed lots are dropped.
        for lot in lots {
            if lot.remaining_amount <= 0.0 {
                continue;
            }
            tx.execute(
                "INSERT INTO cost_basis_lots
                 (wallet, token_mint, trade_id, timestamp, original_amount,
                  remaining_amount, price_per_token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    lot.wallet,
                    lot.token_mint,
                    lot.trade_id,
                    lot.timestamp,
                    lot.original_amount,
                    lot.remaining_amount,
                    lot.price_per_token,
                ],
            )?;
        }

        tx.commit()?;
        debug!(
            wallet = %wallet,
            positions = positions.len(),
            lots = lots.len(),
            "FIFO state replaced"
        );
        Ok(())
    }

    pub fn positions_for_wallet(&self, wallet: &str) -> Result<Vec<Position>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM positions WHERE wallet = ?1 ORDER BY token_mint")?;
        let positions = stmt
            .query_map(params![wallet], position_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(positions)
    }

    pub fn position_for(&self, wallet: &str, mint: &str) -> Result<Option<Position>> {
        let conn = self.conn.lock().unwrap();
        let position = conn
            .query_row(
                "SELECT * FROM positions WHERE wallet = ?1 AND token_mint = ?2",
                params![wallet, mint],
                position_from_row,
            )
            .optional()?;
        Ok(position)
    }

    /// Open lots for a wallet, oldest first within each mint.
    pub fn lots_for_wallet(&self, wallet: &str) -> Result<Vec<CostBasisLot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM cost_basis_lots WHERE wallet = ?1
             ORDER BY token_mint, timestamp, id",
        )?;
        let lots = stmt
            .query_map(params![wallet], lot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(mint: &str, trade_id: &str, remaining: f64) -> CostBasisLot {
        CostBasisLot {
            wallet: "Wa11et".to_string(),
            token_mint: mint.to_string(),
            trade_id: trade_id.to_string(),
            timestamp: 100,
            original_amount: 500.0,
            remaining_amount: remaining,
            price_per_token: 0.002,
        }
    }

    fn position(mint: &str) -> Position {
        Position {
            wallet: "Wa11et".to_string(),
            token_mint: mint.to_string(),
            total_bought: 500.0,
            total_sold: 100.0,
            total_cost_sol: 1.0,
            total_proceeds_sol: 0.5,
            remaining_tokens: 400.0,
            avg_buy_price: 0.002,
            realized_pnl_sol: 0.3,
            trade_count: 2,
            win_count: 1,
            first_trade_at: 100,
            last_trade_at: 200,
        }
    }

    #[test]
    fn test_replace_fifo_state_round_trip() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_fifo_state(
                "Wa11et",
                &[position("MintA")],
                &[lot("MintA", "t1", 400.0)],
            )
            .unwrap();

        let positions = store.positions_for_wallet("Wa11et").unwrap();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].realized_pnl_sol - 0.3).abs() < 1e-9);

        let lots = store.lots_for_wallet("Wa11et").unwrap();
        assert_eq!(lots.len(), 1);
        assert!((lots[0].remaining_amount - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_replace_discards_previous_state_and_empty_lots() {
        let store = Store::open_in_memory().unwrap();
        store
            .replace_fifo_state(
                "Wa11et",
                &[position("MintA"), position("MintB")],
                &[lot("MintA", "t1", 400.0)],
            )
            .unwrap();
        // Recompute shrank to one position; the consumed lot disappears.
        store
            .replace_fifo_state("Wa11et", &[position("MintA")], &[lot("MintA", "t1", 0.0)])
            .unwrap();

        assert_eq!(store.positions_for_wallet("Wa11et").unwrap().len(), 1);
        assert!(store.lots_for_wallet("Wa11et").unwrap().is_empty());
        assert!(store.position_for("Wa11et", "MintB").unwrap().is_none());
    }
}
