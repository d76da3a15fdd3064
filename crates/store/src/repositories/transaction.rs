//! Append-only transaction log.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use greatbank_core::{StoreError, TransactionLog, TransactionQuery, TransactionRecord};
use greatbank_shared::types::{AccountId, TransactionId};

use super::poisoned;

#[derive(Default)]
struct LogState {
    records: Vec<TransactionRecord>,
    by_id: HashMap<TransactionId, usize>,
}

impl LogState {
    fn push(&mut self, record: TransactionRecord) -> TransactionId {
        let id = record.id;
        self.by_id.insert(id, self.records.len());
        self.records.push(record);
        id
    }
}

/// Records in arrival order behind one lock. Nothing is ever removed.
#[derive(Default)]
pub struct MemoryTransactionLog {
    state: RwLock<LogState>,
}

impl MemoryTransactionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all accounts.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().map_err(poisoned)?.records.len())
    }

    /// Returns true when no record has been appended.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn duplicate(id: TransactionId) -> StoreError {
    StoreError::Duplicate {
        entity: "transaction",
        key: id.to_string(),
    }
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn append(&self, record: TransactionRecord) -> Result<TransactionId, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.by_id.contains_key(&record.id) {
            return Err(duplicate(record.id));
        }
        Ok(state.push(record))
    }

    async fn append_all(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<TransactionId>, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let mut incoming = HashSet::with_capacity(records.len());
        for record in &records {
            if state.by_id.contains_key(&record.id) || !incoming.insert(record.id) {
                return Err(duplicate(record.id));
            }
        }
        debug!(count = records.len(), "appending record batch");
        Ok(records.into_iter().map(|r| state.push(r)).collect())
    }

    async fn query(
        &self,
        account_id: AccountId,
        query: TransactionQuery,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matching: Vec<TransactionRecord> = state
            .records
            .iter()
            .filter(|r| r.account_id == account_id && query.contains(r))
            .cloned()
            .collect();
        drop(state);

        matching.sort_by_key(|r| Reverse((r.created_at, r.id)));
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn get(&self, transaction_id: TransactionId) -> Result<TransactionRecord, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        state
            .by_id
            .get(&transaction_id)
            .map(|&index| state.records[index].clone())
            .ok_or(StoreError::TransactionNotFound(transaction_id))
    }
}
