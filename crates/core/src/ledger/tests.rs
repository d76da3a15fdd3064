//! LedgerEngine tests against mocked stores.
//!
//! These cover the paths an in-memory store cannot easily produce: write
//! conflicts on demand, failing appends, and failing reversals.

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use greatbank_shared::config::EngineConfig;
use greatbank_shared::types::{AccountId, AccountNumber, HoldingId, UserId};

use super::engine::LedgerEngine;
use super::error::LedgerError;
use crate::account::{Account, AccountKind};
use crate::investment::{Holding, InstrumentKind};
use crate::store::{
    BalanceWrite, MockAccountStore, MockHoldingBook, MockTransactionLog, StoreError,
};

type Engine = LedgerEngine<MockAccountStore, MockTransactionLog, MockHoldingBook>;

fn config() -> EngineConfig {
    EngineConfig {
        max_conflict_retries: 2,
        retry_backoff_ms: 0,
        recent_transactions_limit: 5,
    }
}

fn engine(accounts: MockAccountStore, log: MockTransactionLog, holdings: MockHoldingBook) -> Engine {
    LedgerEngine::new(
        Arc::new(accounts),
        Arc::new(log),
        Arc::new(holdings),
        &config(),
    )
}

fn conflict(account_id: AccountId) -> StoreError {
    StoreError::Conflict {
        account_id,
        expected: Decimal::ZERO,
        actual: Decimal::ONE,
    }
}

fn account(number: &str) -> Account {
    let number = AccountNumber::parse(number).unwrap();
    Account::new(UserId::new(), number, AccountKind::Checking, "hash")
}

/// Records every delta passed to `apply_balance_delta` and applies it.
fn recording_deltas(accounts: &mut MockAccountStore, times: usize) -> Arc<Mutex<Vec<Decimal>>> {
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&deltas);
    accounts
        .expect_apply_balance_delta()
        .times(times)
        .returning(move |_, delta, expected| {
            seen.lock().unwrap().push(delta);
            Ok(expected + delta)
        });
    deltas
}

// ========== Validation ==========

#[tokio::test]
async fn test_non_positive_amounts_touch_nothing() {
    let engine = engine(
        MockAccountStore::new(),
        MockTransactionLog::new(),
        MockHoldingBook::new(),
    );
    let id = AccountId::new();

    assert!(matches!(
        engine.deposit(id, Decimal::ZERO, "").await,
        Err(LedgerError::InvalidAmount { field: "amount", .. })
    ));
    assert!(matches!(
        engine.withdraw(id, dec!(-5), "").await,
        Err(LedgerError::InvalidAmount { .. })
    ));
    assert!(matches!(
        engine
            .purchase_investment(id, InstrumentKind::Stock, "ACME", dec!(1), Decimal::ZERO)
            .await,
        Err(LedgerError::InvalidAmount { field: "price", .. })
    ));
}

#[tokio::test]
async fn test_blank_symbol_rejected() {
    let engine = engine(
        MockAccountStore::new(),
        MockTransactionLog::new(),
        MockHoldingBook::new(),
    );

    let result = engine
        .purchase_investment(AccountId::new(), InstrumentKind::Etf, "   ", dec!(1), dec!(10))
        .await;

    assert_eq!(result.unwrap_err(), LedgerError::InvalidSymbol);
}

#[tokio::test]
async fn test_overflowing_deposit_writes_nothing() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(Decimal::MAX));
    accounts.expect_apply_balance_delta().never();
    let mut log = MockTransactionLog::new();
    log.expect_append().never();

    let result = engine(accounts, log, MockHoldingBook::new())
        .deposit(AccountId::new(), dec!(1), "")
        .await;

    assert_eq!(
        result,
        Err(LedgerError::InvalidAmount {
            field: "amount",
            value: dec!(1),
        })
    );
}

#[tokio::test]
async fn test_overflowing_transfer_credit_writes_nothing() {
    let from = AccountId::new();
    let to = AccountId::new();
    let sender = account("10000001");
    let mut accounts = MockAccountStore::new();
    accounts
        .expect_get_account()
        .returning(move |_| Ok(sender.clone()));
    accounts
        .expect_resolve_account_number()
        .returning(move |_| Ok(to));
    accounts
        .expect_get_balance()
        .returning(move |id| Ok(if id == from { dec!(10) } else { Decimal::MAX }));
    accounts.expect_apply_balance_deltas().never();
    let mut log = MockTransactionLog::new();
    log.expect_append_all().never();

    let result = engine(accounts, log, MockHoldingBook::new())
        .transfer(from, &AccountNumber::parse("20000002").unwrap(), dec!(5), "")
        .await;

    assert!(matches!(result, Err(LedgerError::InvalidAmount { field: "amount", .. })));
}

#[tokio::test]
async fn test_overflowing_order_value_touches_nothing() {
    let engine = engine(
        MockAccountStore::new(),
        MockTransactionLog::new(),
        MockHoldingBook::new(),
    );

    let purchase = engine
        .purchase_investment(AccountId::new(), InstrumentKind::Stock, "ACME", Decimal::MAX, dec!(2))
        .await;
    let sale = engine
        .sell_investment(HoldingId::new(), AccountId::new(), Decimal::MAX, dec!(2))
        .await;

    assert_eq!(
        purchase.unwrap_err(),
        LedgerError::InvalidAmount {
            field: "shares",
            value: Decimal::MAX,
        }
    );
    assert_eq!(
        sale.unwrap_err(),
        LedgerError::InvalidAmount {
            field: "shares",
            value: Decimal::MAX,
        }
    );
}

// ========== Conflict Retry ==========

#[tokio::test]
async fn test_deposit_retries_conflicts_then_commits() {
    let id = AccountId::new();
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    let mut calls = 0;
    accounts
        .expect_apply_balance_delta()
        .times(3)
        .returning(move |account_id, delta, expected| {
            calls += 1;
            if calls < 3 {
                Err(conflict(account_id))
            } else {
                Ok(expected + delta)
            }
        });
    let mut log = MockTransactionLog::new();
    log.expect_append().times(1).returning(|record| Ok(record.id));

    let balance = engine(accounts, log, MockHoldingBook::new())
        .deposit(id, dec!(50), "")
        .await
        .unwrap();

    assert_eq!(balance, dec!(150));
}

#[tokio::test]
async fn test_exhausted_retries_are_unavailable_and_unrecorded() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    accounts
        .expect_apply_balance_delta()
        .times(3)
        .returning(|account_id, _, _| Err(conflict(account_id)));
    let mut log = MockTransactionLog::new();
    log.expect_append().never();

    let result = engine(accounts, log, MockHoldingBook::new())
        .withdraw(AccountId::new(), dec!(10), "")
        .await;

    assert_eq!(result, Err(LedgerError::Unavailable { attempts: 3 }));
}

#[tokio::test]
async fn test_insufficient_funds_writes_nothing() {
    let id = AccountId::new();
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(50)));
    accounts.expect_apply_balance_delta().never();
    let mut log = MockTransactionLog::new();
    log.expect_append().never();

    let result = engine(accounts, log, MockHoldingBook::new())
        .withdraw(id, dec!(80), "")
        .await;

    assert_eq!(
        result,
        Err(LedgerError::InsufficientFunds {
            account_id: id,
            available: dec!(50),
            requested: dec!(80),
        })
    );
}

// ========== Compensation ==========

#[tokio::test]
async fn test_withdraw_log_failure_reverses_debit() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    let deltas = recording_deltas(&mut accounts, 2);
    let mut log = MockTransactionLog::new();
    log.expect_append()
        .times(1)
        .returning(|_| Err(StoreError::Backend("log offline".into())));

    let result = engine(accounts, log, MockHoldingBook::new())
        .withdraw(AccountId::new(), dec!(40), "ATM")
        .await;

    assert!(matches!(result, Err(LedgerError::Storage(msg)) if msg.contains("log offline")));
    assert_eq!(*deltas.lock().unwrap(), vec![dec!(-40), dec!(40)]);
}

#[tokio::test]
async fn test_failed_reversal_reports_compensation_failure() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    let mut calls = 0;
    accounts
        .expect_apply_balance_delta()
        .times(2)
        .returning(move |_, delta, expected| {
            calls += 1;
            if calls == 1 {
                Ok(expected + delta)
            } else {
                Err(StoreError::Backend("store offline".into()))
            }
        });
    let mut log = MockTransactionLog::new();
    log.expect_append()
        .returning(|_| Err(StoreError::Backend("log offline".into())));

    let result = engine(accounts, log, MockHoldingBook::new())
        .deposit(AccountId::new(), dec!(25), "")
        .await;

    match result {
        Err(LedgerError::CompensationFailed {
            operation,
            cause,
            compensation,
        }) => {
            assert_eq!(operation, "deposit");
            assert!(cause.contains("log offline"));
            assert!(compensation.contains("store offline"));
        }
        other => panic!("expected CompensationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transfer_leg_failure_reverses_both_balances() {
    let sender = account("1111222233334444");
    let from = sender.id;
    let to = AccountId::new();

    let mut accounts = MockAccountStore::new();
    accounts
        .expect_get_account()
        .returning(move |_| Ok(sender.clone()));
    accounts
        .expect_resolve_account_number()
        .returning(move |_| Ok(to));
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    let batches = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&batches);
    accounts
        .expect_apply_balance_deltas()
        .times(2)
        .returning(move |writes: Vec<BalanceWrite>| {
            let balances = writes
                .iter()
                .map(|w| w.expected_balance + w.delta)
                .collect();
            seen.lock().unwrap().push(writes);
            Ok(balances)
        });
    let mut log = MockTransactionLog::new();
    log.expect_append_all()
        .times(1)
        .returning(|_| Err(StoreError::Backend("log offline".into())));

    let destination = AccountNumber::parse("5555666677778888").unwrap();
    let result = engine(accounts, log, MockHoldingBook::new())
        .transfer(from, &destination, dec!(30), "Rent")
        .await;

    assert!(matches!(result, Err(LedgerError::Storage(_))));
    let batches = batches.lock().unwrap();
    assert_eq!(
        batches[0],
        vec![
            BalanceWrite::new(from, dec!(-30), dec!(100)),
            BalanceWrite::new(to, dec!(30), dec!(100)),
        ]
    );
    assert_eq!(
        batches[1],
        vec![
            BalanceWrite::new(to, dec!(-30), dec!(100)),
            BalanceWrite::new(from, dec!(30), dec!(100)),
        ]
    );
}

#[tokio::test]
async fn test_transfer_to_own_number_rejected() {
    let sender = account("1111222233334444");
    let from = sender.id;
    let number = sender.account_number.clone();

    let mut accounts = MockAccountStore::new();
    accounts
        .expect_get_account()
        .returning(move |_| Ok(sender.clone()));
    accounts
        .expect_resolve_account_number()
        .returning(move |_| Ok(from));
    accounts.expect_apply_balance_deltas().never();

    let result = engine(accounts, MockTransactionLog::new(), MockHoldingBook::new())
        .transfer(from, &number, dec!(10), "")
        .await;

    assert_eq!(result, Err(LedgerError::SameAccount(from)));
}

#[tokio::test]
async fn test_purchase_refunds_when_holding_not_created() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(1000)));
    let deltas = recording_deltas(&mut accounts, 2);
    let mut holdings = MockHoldingBook::new();
    holdings
        .expect_create()
        .times(1)
        .returning(|_| Err(StoreError::Backend("book offline".into())));
    let mut log = MockTransactionLog::new();
    log.expect_append().never();

    let result = engine(accounts, log, holdings)
        .purchase_investment(AccountId::new(), InstrumentKind::Stock, "acme", dec!(4), dec!(25))
        .await;

    assert!(matches!(result, Err(LedgerError::Storage(_))));
    assert_eq!(*deltas.lock().unwrap(), vec![dec!(-100), dec!(100)]);
}

#[tokio::test]
async fn test_purchase_log_failure_closes_holding_and_refunds() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(1000)));
    let deltas = recording_deltas(&mut accounts, 2);
    let mut holdings = MockHoldingBook::new();
    holdings.expect_create().returning(|h| Ok(h.id));
    holdings
        .expect_reduce_or_close()
        .withf(|_, shares| *shares == dec!(4))
        .times(1)
        .returning(|_, _| Ok(Decimal::ZERO));
    let mut log = MockTransactionLog::new();
    log.expect_append()
        .returning(|_| Err(StoreError::Backend("log offline".into())));

    let result = engine(accounts, log, holdings)
        .purchase_investment(AccountId::new(), InstrumentKind::Stock, "ACME", dec!(4), dec!(25))
        .await;

    assert!(matches!(result, Err(LedgerError::Storage(_))));
    assert_eq!(*deltas.lock().unwrap(), vec![dec!(-100), dec!(100)]);
}

// ========== Sales ==========

fn held(account_id: AccountId) -> Holding {
    Holding::purchase(account_id, InstrumentKind::Stock, "ACME", dec!(10), dec!(20))
}

#[tokio::test]
async fn test_sell_other_accounts_holding_is_not_found() {
    let holding = held(AccountId::new());
    let holding_id = holding.id;
    let mut holdings = MockHoldingBook::new();
    holdings
        .expect_get()
        .returning(move |_| Ok(holding.clone()));
    holdings.expect_reduce_or_close().never();

    let result = engine(MockAccountStore::new(), MockTransactionLog::new(), holdings)
        .sell_investment(holding_id, AccountId::new(), dec!(1), dec!(30))
        .await;

    assert_eq!(result, Err(LedgerError::HoldingNotFound(holding_id)));
}

#[tokio::test]
async fn test_sell_more_than_held_touches_nothing() {
    let account_id = AccountId::new();
    let holding = held(account_id);
    let holding_id = holding.id;
    let mut holdings = MockHoldingBook::new();
    holdings
        .expect_get()
        .returning(move |_| Ok(holding.clone()));
    holdings.expect_reduce_or_close().never();

    let result = engine(MockAccountStore::new(), MockTransactionLog::new(), holdings)
        .sell_investment(holding_id, account_id, dec!(11), dec!(30))
        .await;

    assert_eq!(
        result,
        Err(LedgerError::InsufficientShares {
            holding_id,
            available: dec!(10),
            requested: dec!(11),
        })
    );
}

#[tokio::test]
async fn test_sell_credit_failure_restores_shares() {
    let account_id = AccountId::new();
    let holding = held(account_id);
    let holding_id = holding.id;
    let snapshot = holding.clone();

    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(0)));
    accounts
        .expect_apply_balance_delta()
        .returning(|_, _, _| Err(StoreError::Backend("store offline".into())));
    let mut holdings = MockHoldingBook::new();
    holdings
        .expect_get()
        .returning(move |_| Ok(holding.clone()));
    holdings
        .expect_reduce_or_close()
        .times(1)
        .returning(|_, _| Ok(dec!(6)));
    holdings
        .expect_restore()
        .withf(move |h, shares| *h == snapshot && *shares == dec!(4))
        .times(1)
        .returning(|_, _| Ok(dec!(10)));
    let mut log = MockTransactionLog::new();
    log.expect_append().never();

    let result = engine(accounts, log, holdings)
        .sell_investment(holding_id, account_id, dec!(4), dec!(30))
        .await;

    assert!(matches!(result, Err(LedgerError::Storage(msg)) if msg.contains("store offline")));
}

#[tokio::test]
async fn test_sell_records_proceeds() {
    let account_id = AccountId::new();
    let holding = held(account_id);
    let holding_id = holding.id;

    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(dec!(100)));
    recording_deltas(&mut accounts, 1);
    let mut holdings = MockHoldingBook::new();
    holdings
        .expect_get()
        .returning(move |_| Ok(holding.clone()));
    holdings
        .expect_reduce_or_close()
        .returning(|_, _| Ok(dec!(7)));
    let mut log = MockTransactionLog::new();
    log.expect_append()
        .withf(|r| r.amount == dec!(90) && r.description == "Sold 3 shares of ACME")
        .times(1)
        .returning(|r| Ok(r.id));

    let receipt = engine(accounts, log, holdings)
        .sell_investment(holding_id, account_id, dec!(3), dec!(30))
        .await
        .unwrap();

    assert_eq!(receipt.proceeds, dec!(90));
    assert_eq!(receipt.remaining_shares, dec!(7));
    assert_eq!(receipt.new_balance, dec!(190));
}

// ========== Reads ==========

#[tokio::test]
async fn test_statement_rejects_inverted_range() {
    let engine = engine(
        MockAccountStore::new(),
        MockTransactionLog::new(),
        MockHoldingBook::new(),
    );
    let now = chrono::Utc::now();

    let result = engine
        .statement(AccountId::new(), now, now - chrono::Duration::days(1))
        .await;

    assert_eq!(result, Err(LedgerError::InvalidDateRange));
}

#[tokio::test]
async fn test_recent_transactions_uses_configured_limit() {
    let mut accounts = MockAccountStore::new();
    accounts.expect_get_balance().returning(|_| Ok(Decimal::ZERO));
    let mut log = MockTransactionLog::new();
    log.expect_query()
        .withf(|_, q| q.limit == Some(5) && q.from.is_none() && q.to.is_none())
        .times(1)
        .returning(|_, _| Ok(Vec::new()));

    let records = engine(accounts, log, MockHoldingBook::new())
        .recent_transactions(AccountId::new(), None)
        .await
        .unwrap();

    assert!(records.is_empty());
}
