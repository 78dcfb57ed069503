//! Realized profit-and-loss under FIFO cost-basis accounting.

pub mod fifo;
pub mod summary;

pub use fifo::{compute_wallet_fifo, recompute_wallet, FifoState};
pub use summary::{summarize, PeriodSummary, Timeframe, TradeOutcome};
