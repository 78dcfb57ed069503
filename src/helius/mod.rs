//! Enhanced-transactions provider (Helius)
//!
//! Exposes the two upstream operations the sync coordinator consumes:
//! signature paging and enhanced-transaction batches.

pub mod client;
pub mod types;

pub use client::HeliusClient;
pub use types::{EnhancedTransaction, SignatureInfo};

use async_trait::async_trait;

use crate::error::Result;

/// Seam between the sync coordinator and the upstream provider. Implemented
/// by [`HeliusClient`] and by in-memory mocks in tests.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Page transaction signatures for an address, newest-first.
    async fn signatures(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>>;

    /// Fetch enhanced records for up to 100 signatures.
    async fn enhanced(&self, signatures: &[String]) -> Result<Vec<EnhancedTransaction>>;
}
