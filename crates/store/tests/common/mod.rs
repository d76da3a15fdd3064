//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use greatbank_core::{
    Account, AccountKind, LedgerEngine, StoreError, TransactionLog, TransactionQuery,
    TransactionRecord,
};
use greatbank_shared::config::EngineConfig;
use greatbank_shared::types::{AccountId, AccountNumber, TransactionId, UserId};
use greatbank_store::{MemoryAccountStore, MemoryHoldingBook, MemoryStore, MemoryTransactionLog};

/// No backoff; single-task tests never conflict.
pub fn config() -> EngineConfig {
    EngineConfig {
        max_conflict_retries: 5,
        retry_backoff_ms: 0,
        recent_transactions_limit: 5,
    }
}

/// Patient retries for tests that pile many tasks onto one account.
pub fn contended_config() -> EngineConfig {
    EngineConfig {
        max_conflict_retries: 200,
        retry_backoff_ms: 1,
        recent_transactions_limit: 5,
    }
}

pub fn open_account(accounts: &MemoryAccountStore, number: &str, balance: Decimal) -> AccountId {
    let account = Account::new(
        UserId::new(),
        AccountNumber::parse(number).unwrap(),
        AccountKind::Checking,
        "hash",
    )
    .with_balance(balance);
    accounts.open_account(account).unwrap()
}

pub fn number(raw: &str) -> AccountNumber {
    AccountNumber::parse(raw).unwrap()
}

pub async fn records(store: &MemoryStore, account_id: AccountId) -> Vec<TransactionRecord> {
    store
        .transactions
        .query(account_id, TransactionQuery::default())
        .await
        .unwrap()
}

/// A transaction log that can be switched into a failing state.
#[derive(Default)]
pub struct FlakyLog {
    inner: MemoryTransactionLog,
    failing: AtomicBool,
}

impl FlakyLog {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Backend("log unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TransactionLog for FlakyLog {
    async fn append(&self, record: TransactionRecord) -> Result<TransactionId, StoreError> {
        self.check()?;
        self.inner.append(record).await
    }

    async fn append_all(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<Vec<TransactionId>, StoreError> {
        self.check()?;
        self.inner.append_all(records).await
    }

    async fn query(
        &self,
        account_id: AccountId,
        query: TransactionQuery,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.inner.query(account_id, query).await
    }

    async fn get(&self, transaction_id: TransactionId) -> Result<TransactionRecord, StoreError> {
        self.inner.get(transaction_id).await
    }
}

pub type FlakyEngine = LedgerEngine<MemoryAccountStore, FlakyLog, MemoryHoldingBook>;

/// Engine over in-memory accounts and holdings with a switchable log.
pub struct FlakyFixture {
    pub accounts: Arc<MemoryAccountStore>,
    pub log: Arc<FlakyLog>,
    pub holdings: Arc<MemoryHoldingBook>,
    pub engine: FlakyEngine,
}

impl FlakyFixture {
    pub fn new() -> Self {
        let accounts = Arc::new(MemoryAccountStore::new());
        let log = Arc::new(FlakyLog::default());
        let holdings = Arc::new(MemoryHoldingBook::new());
        let engine = LedgerEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&log),
            Arc::clone(&holdings),
            &config(),
        );
        Self {
            accounts,
            log,
            holdings,
            engine,
        }
    }
}
