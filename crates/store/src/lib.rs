//! In-memory store layer for GreatBank.
//!
//! This crate provides:
//! - Concurrency-safe implementations of the core store ports
//! - `MemoryStore`, a bundle that wires them into a `LedgerEngine`
//!
//! State lives for the lifetime of the process. Nothing is persisted.

pub mod repositories;

use std::sync::Arc;

use greatbank_core::{LedgerEngine, PriceUpdater};
use greatbank_shared::config::EngineConfig;

pub use repositories::{MemoryAccountStore, MemoryHoldingBook, MemoryTransactionLog};

/// Engine type served by a [`MemoryStore`].
pub type MemoryLedgerEngine =
    LedgerEngine<MemoryAccountStore, MemoryTransactionLog, MemoryHoldingBook>;

/// The three in-memory stores, shared behind `Arc`s.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Accounts and balances.
    pub accounts: Arc<MemoryAccountStore>,
    /// Transaction records.
    pub transactions: Arc<MemoryTransactionLog>,
    /// Investment holdings.
    pub holdings: Arc<MemoryHoldingBook>,
}

impl MemoryStore {
    /// Creates empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an engine over these stores.
    #[must_use]
    pub fn engine(&self, config: &EngineConfig) -> MemoryLedgerEngine {
        LedgerEngine::new(
            Arc::clone(&self.accounts),
            Arc::clone(&self.transactions),
            Arc::clone(&self.holdings),
            config,
        )
    }

    /// Builds a price updater over the holding book.
    #[must_use]
    pub fn price_updater(&self) -> PriceUpdater<MemoryHoldingBook> {
        PriceUpdater::new(Arc::clone(&self.holdings))
    }
}
