//! FIFO cost-basis engine
//!
//! Rebuilds a wallet's positions and open lots from scratch on every run.
//! Sells consume the oldest lot with remaining tokens first; a sell that
//! outruns the recorded buys is matched at zero cost so an unbalanced
//! trade stream (missing history, airdrops sold later) never aborts the
//! rebuild.

use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use crate::db::Store;
use crate::error::Result;
use crate::model::{CostBasisLot, Position, Trade, TradeSide};

/// Freshly computed FIFO state for one wallet.
#[derive(Debug, Clone, Default)]
pub struct FifoState {
    pub positions: Vec<Position>,
    /// Lots with remaining tokens, oldest first within each mint
    pub lots: Vec<CostBasisLot>,
}

impl FifoState {
    pub fn position_for(&self, mint: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.token_mint == mint)
    }
}

/// Compute positions and surviving lots for a wallet. Pure function of the
/// trade set; grouping and ordering make it deterministic.
pub fn compute_wallet_fifo(wallet: &str, trades: &[Trade]) -> FifoState {
    let mut by_mint: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        by_mint.entry(&trade.token_mint).or_default().push(trade);
    }

    let mut state = FifoState::default();

    for (mint, mut mint_trades) in by_mint {
        // Stable order: time, then signature, buys before sells on ties.
        mint_trades.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.signature.cmp(&b.signature))
                .then_with(|| b.side.is_buy().cmp(&a.side.is_buy()))
        });

        let mut queue: VecDeque<CostBasisLot> = VecDeque::new();
        let mut position = Position {
            wallet: wallet.to_string(),
            token_mint: mint.to_string(),
            first_trade_at: mint_trades.first().map(|t| t.timestamp).unwrap_or(0),
            last_trade_at: mint_trades.last().map(|t| t.timestamp).unwrap_or(0),
            trade_count: mint_trades.len() as u32,
            ..Default::default()
        };

        for trade in &mint_trades {
            match trade.side {
                TradeSide::Buy => {
                    position.total_bought += trade.token_amount;
                    position.total_cost_sol += trade.sol_amount;
                    queue.push_back(CostBasisLot {
                        wallet: wallet.to_string(),
                        token_mint: mint.to_string(),
                        trade_id: trade.id.clone(),
                        timestamp: trade.timestamp,
                        original_amount: trade.token_amount,
                        remaining_amount: trade.token_amount,
                        price_per_token: if trade.token_amount > 0.0 {
                            trade.sol_amount / trade.token_amount
                        } else {
                            0.0
                        },
                    });
                }
                TradeSide::Sell => {
                    position.total_sold += trade.token_amount;
                    position.total_proceeds_sol += trade.sol_amount;

                    let mut left = trade.token_amount;
                    let mut matched_cost = 0.0;
                    for lot in queue.iter_mut() {
                        if left <= 0.0 {
                            break;
                        }
                        if lot.remaining_amount <= 0.0 {
                            continue;
                        }
                        let take = lot.remaining_amount.min(left);
                        lot.remaining_amount -= take;
                        left -= take;
                        matched_cost += take * lot.price_per_token;
                    }
                    // Remainder past the queue is zero-cost: proceeds count
                    // as pure profit.

                    let sell_pnl = trade.sol_amount - matched_cost;
                    position.realized_pnl_sol += sell_pnl;
                    if sell_pnl > 0.0 {
                        position.win_count += 1;
                    }
                }
            }
        }

        position.remaining_tokens = (position.total_bought - position.total_sold).max(0.0);
        position.avg_buy_price = if position.total_bought > 0.0 {
            position.total_cost_sol / position.total_bought
        } else {
            0.0
        };

        state
            .lots
            .extend(queue.into_iter().filter(|lot| lot.remaining_amount > 0.0));
        state.positions.push(position);
    }

    state
}

/// Rebuild and persist a wallet's FIFO state from the given trades. The
/// store swap is atomic; readers see either the old state or the new one.
pub fn recompute_wallet(store: &Store, wallet: &str, trades: &[Trade]) -> Result<FifoState> {
    let state = compute_wallet_fifo(wallet, trades);
    store.replace_fifo_state(wallet, &state.positions, &state.lots)?;
    debug!(
        wallet = %wallet,
        positions = state.positions.len(),
        open_lots = state.lots.len(),
        "Recomputed FIFO state"
    );
    Ok(state)
}
