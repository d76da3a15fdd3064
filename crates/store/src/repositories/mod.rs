//! Store implementations.

pub mod account;
pub mod holding;
pub mod transaction;

pub use account::MemoryAccountStore;
pub use holding::MemoryHoldingBook;
pub use transaction::MemoryTransactionLog;

use std::sync::PoisonError;

use greatbank_core::StoreError;

/// A poisoned lock means a writer panicked mid-update.
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}
