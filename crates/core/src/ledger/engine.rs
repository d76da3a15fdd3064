//! The ledger transaction engine.
//!
//! Every operation re-reads the state it depends on, validates, and commits
//! through a conditional balance write. Business-rule rejections happen
//! before any write. When a later step fails (log append, holding change),
//! the earlier writes are reversed before the error is returned, so callers
//! observe each operation as all-or-nothing even though the three stores
//! share no transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use greatbank_shared::config::EngineConfig;
use greatbank_shared::types::{AccountId, AccountNumber, HoldingId, TransactionId, UserId};

use super::error::LedgerError;
use super::retry::{Attempt, RetryPolicy};
use super::types::{
    PurchaseReceipt, SaleReceipt, TransactionKind, TransactionQuery, TransactionRecord,
    TransferReceipt,
};
use crate::account::Account;
use crate::investment::{Holding, InstrumentKind, PortfolioSummary};
use crate::store::{AccountStore, BalanceWrite, HoldingBook, TransactionLog};

/// Orchestrates the account store, transaction log and holding book.
///
/// The engine holds no cached state; it can be shared freely across tasks.
pub struct LedgerEngine<A, L, H> {
    accounts: Arc<A>,
    log: Arc<L>,
    holdings: Arc<H>,
    retry: RetryPolicy,
    recent_limit: usize,
}

impl<A, L, H> LedgerEngine<A, L, H>
where
    A: AccountStore,
    L: TransactionLog,
    H: HoldingBook,
{
    /// Creates an engine over injected stores.
    #[must_use]
    pub fn new(accounts: Arc<A>, log: Arc<L>, holdings: Arc<H>, config: &EngineConfig) -> Self {
        Self {
            accounts,
            log,
            holdings,
            retry: RetryPolicy::from_config(config),
            recent_limit: config.recent_transactions_limit,
        }
    }

    /// The retry policy applied to conflicting balance writes.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // ========== Money Movements ==========

    /// Pays `amount` into an account and returns the new balance.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount <= 0` or the new balance would be out of
    /// range, `AccountNotFound`, `Unavailable`
    /// after repeated conflicts, `Storage` if the record could not be written
    /// (the balance change is reversed first).
    #[instrument(skip_all, fields(account_id = %account_id, amount = %amount))]
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal, LedgerError> {
        ensure_positive("amount", amount)?;
        let description = describe(description, TransactionKind::Deposit);

        let new_balance = self.credit("deposit", account_id, amount).await?;

        let record = TransactionRecord::new(account_id, TransactionKind::Deposit, amount, description);
        let record_id = match self.log.append(record).await {
            Ok(id) => id,
            Err(err) => {
                let undo = self.debit("deposit", account_id, amount).await.map(drop);
                return Err(compensated("deposit", err.into(), undo));
            }
        };

        info!(%record_id, %new_balance, "deposit committed");
        Ok(new_balance)
    }

    /// Pays `amount` out of an account and returns the new balance.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the balance does not cover `amount`; otherwise
    /// as [`deposit`](Self::deposit).
    #[instrument(skip_all, fields(account_id = %account_id, amount = %amount))]
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal, LedgerError> {
        ensure_positive("amount", amount)?;
        let description = describe(description, TransactionKind::Withdrawal);

        let new_balance = self.debit("withdraw", account_id, amount).await?;

        let record =
            TransactionRecord::new(account_id, TransactionKind::Withdrawal, amount, description);
        let record_id = match self.log.append(record).await {
            Ok(id) => id,
            Err(err) => {
                let undo = self.credit("withdraw", account_id, amount).await.map(drop);
                return Err(compensated("withdraw", err.into(), undo));
            }
        };

        info!(%record_id, %new_balance, "withdrawal committed");
        Ok(new_balance)
    }

    /// Moves `amount` from one account to the account with the given number.
    ///
    /// Both balances change in one conditional write and both legs are
    /// appended in one batch. The legs reference each other.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound` for the sender, `RecipientNotFound`,
    /// `SameAccount`, `InsufficientFunds`, `Unavailable`, `Storage`.
    #[instrument(
        skip_all,
        fields(from = %from_account_id, to = %to_account_number.masked(), amount = %amount)
    )]
    pub async fn transfer(
        &self,
        from_account_id: AccountId,
        to_account_number: &AccountNumber,
        amount: Decimal,
        description: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_positive("amount", amount)?;
        let description = describe(description, TransactionKind::Transfer);

        let sender = self.accounts.get_account(from_account_id).await?;
        let to_account_id = self
            .accounts
            .resolve_account_number(to_account_number)
            .await?;
        if to_account_id == from_account_id {
            return Err(LedgerError::SameAccount(from_account_id));
        }

        let (from_balance, to_balance) = self
            .retry
            .run("transfer", move || async move {
                let available = self.accounts.get_balance(from_account_id).await?;
                if amount > available {
                    return Err(Attempt::Fail(LedgerError::InsufficientFunds {
                        account_id: from_account_id,
                        available,
                        requested: amount,
                    }));
                }
                let recipient = self.accounts.get_balance(to_account_id).await?;
                ensure_fits(recipient, amount)?;

                let written = self
                    .accounts
                    .apply_balance_deltas(vec![
                        BalanceWrite::new(from_account_id, -amount, available),
                        BalanceWrite::new(to_account_id, amount, recipient),
                    ])
                    .await?;
                match written.as_slice() {
                    [from, to] => Ok::<_, Attempt>((*from, *to)),
                    other => Err(Attempt::Fail(LedgerError::Storage(format!(
                        "batch write returned {} balances for 2 accounts",
                        other.len()
                    )))),
                }
            })
            .await?;

        let (debit, credit) = TransactionRecord::transfer_legs(
            from_account_id,
            to_account_id,
            amount,
            format!("{description} to {to_account_number}"),
            format!("{description} from {}", sender.account_number),
        );
        let (debit_record_id, credit_record_id) = (debit.id, credit.id);

        if let Err(err) = self.log.append_all(vec![debit, credit]).await {
            let undo = self
                .move_balance("transfer", to_account_id, from_account_id, amount)
                .await;
            return Err(compensated("transfer", err.into(), undo));
        }

        info!(
            %debit_record_id,
            %credit_record_id,
            %from_balance,
            "transfer committed"
        );
        Ok(TransferReceipt {
            recipient_id: to_account_id,
            from_balance,
            to_balance,
            debit_record_id,
            credit_record_id,
        })
    }

    /// Buys `shares` of `symbol` at `price`, opening a new holding.
    ///
    /// Lots are never merged: buying a symbol the account already holds
    /// opens a second holding.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for non-positive shares or price, or when
    /// `shares * price` is out of range, `InvalidSymbol`,
    /// `InsufficientFunds` if `shares * price` exceeds the balance,
    /// `AccountNotFound`, `Unavailable`, `Storage`.
    #[instrument(skip_all, fields(account_id = %account_id, symbol = %symbol, shares = %shares))]
    pub async fn purchase_investment(
        &self,
        account_id: AccountId,
        instrument_kind: InstrumentKind,
        symbol: &str,
        shares: Decimal,
        price: Decimal,
    ) -> Result<PurchaseReceipt, LedgerError> {
        ensure_positive("shares", shares)?;
        ensure_positive("price", price)?;
        let symbol = normalize_symbol(symbol)?;
        let cost = order_value(shares, price)?;

        let new_balance = self.debit("purchase_investment", account_id, cost).await?;

        let holding = Holding::purchase(account_id, instrument_kind, symbol, shares, price);
        if let Err(err) = self.holdings.create(holding.clone()).await {
            let undo = self
                .credit("purchase_investment", account_id, cost)
                .await
                .map(drop);
            return Err(compensated("purchase_investment", err.into(), undo));
        }

        let record = TransactionRecord::new(
            account_id,
            TransactionKind::Investment,
            cost,
            format!("Purchased {shares} shares of {}", holding.symbol),
        );
        let record_id = match self.log.append(record).await {
            Ok(id) => id,
            Err(err) => {
                let undo = async {
                    self.holdings
                        .reduce_or_close(holding.id, holding.shares)
                        .await?;
                    self.credit("purchase_investment", account_id, cost).await?;
                    Ok::<(), LedgerError>(())
                }
                .await;
                return Err(compensated("purchase_investment", err.into(), undo));
            }
        };

        info!(holding_id = %holding.id, %cost, %new_balance, "investment purchased");
        Ok(PurchaseReceipt {
            new_balance,
            holding,
            record_id,
        })
    }

    /// Sells `shares_to_sell` from a holding at `selling_price`.
    ///
    /// Selling every share closes the holding; it disappears from
    /// [`holdings`](Self::holdings).
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `HoldingNotFound` if absent or owned by another
    /// account, `InsufficientShares`, `AccountNotFound`, `Unavailable`,
    /// `Storage`.
    #[instrument(skip_all, fields(holding_id = %holding_id, account_id = %account_id, shares = %shares_to_sell))]
    pub async fn sell_investment(
        &self,
        holding_id: HoldingId,
        account_id: AccountId,
        shares_to_sell: Decimal,
        selling_price: Decimal,
    ) -> Result<SaleReceipt, LedgerError> {
        ensure_positive("shares", shares_to_sell)?;
        ensure_positive("price", selling_price)?;
        let proceeds = order_value(shares_to_sell, selling_price)?;

        let holding = self.holdings.get(holding_id).await?;
        if holding.account_id != account_id {
            debug!(owner = %holding.account_id, "holding belongs to another account");
            return Err(LedgerError::HoldingNotFound(holding_id));
        }
        if shares_to_sell > holding.shares {
            return Err(LedgerError::InsufficientShares {
                holding_id,
                available: holding.shares,
                requested: shares_to_sell,
            });
        }
        // The proceeds need somewhere to land before the holding is touched.
        let balance = self.accounts.get_balance(account_id).await?;
        ensure_fits(balance, proceeds)?;

        let remaining_shares = self
            .holdings
            .reduce_or_close(holding_id, shares_to_sell)
            .await?;

        let new_balance = match self.credit("sell_investment", account_id, proceeds).await {
            Ok(balance) => balance,
            Err(err) => {
                let undo = self
                    .holdings
                    .restore(holding.clone(), shares_to_sell)
                    .await
                    .map(drop)
                    .map_err(LedgerError::from);
                return Err(compensated("sell_investment", err, undo));
            }
        };

        let record = TransactionRecord::new(
            account_id,
            TransactionKind::Investment,
            proceeds,
            format!("Sold {shares_to_sell} shares of {}", holding.symbol),
        );
        let record_id = match self.log.append(record).await {
            Ok(id) => id,
            Err(err) => {
                let undo = async {
                    self.debit("sell_investment", account_id, proceeds).await?;
                    self.holdings.restore(holding.clone(), shares_to_sell).await?;
                    Ok::<(), LedgerError>(())
                }
                .await;
                return Err(compensated("sell_investment", err.into(), undo));
            }
        };

        info!(%proceeds, %remaining_shares, %new_balance, "investment sold");
        Ok(SaleReceipt {
            new_balance,
            proceeds,
            remaining_shares,
            record_id,
        })
    }

    // ========== Reads ==========

    /// Loads an account.
    pub async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        Ok(self.accounts.get_account(account_id).await?)
    }

    /// Reads an account's current balance.
    pub async fn balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.accounts.get_balance(account_id).await?)
    }

    /// Lists the accounts a user owns.
    pub async fn accounts_for_owner(&self, owner_id: UserId) -> Result<Vec<Account>, LedgerError> {
        Ok(self.accounts.find_by_owner(owner_id).await?)
    }

    /// The most recent records on an account, newest first.
    ///
    /// `limit` defaults to the configured `recent_transactions_limit`.
    pub async fn recent_transactions(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.accounts.get_balance(account_id).await?;
        let query = TransactionQuery::recent(limit.unwrap_or(self.recent_limit));
        Ok(self.log.query(account_id, query).await?)
    }

    /// Every record on an account created within `[from, to]`, newest first.
    pub async fn statement(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidDateRange);
        }
        self.accounts.get_balance(account_id).await?;
        Ok(self
            .log
            .query(account_id, TransactionQuery::between(from, to))
            .await?)
    }

    /// Loads a single record.
    pub async fn transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionRecord, LedgerError> {
        Ok(self.log.get(transaction_id).await?)
    }

    /// Follows a transfer leg to its counterpart. `None` for non-transfers.
    pub async fn counterpart(
        &self,
        record: &TransactionRecord,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        match record.reference_id {
            Some(reference) => Ok(Some(self.log.get(reference).await?)),
            None => Ok(None),
        }
    }

    /// An account's open holdings, most recent purchase first.
    pub async fn holdings(&self, account_id: AccountId) -> Result<Vec<Holding>, LedgerError> {
        self.accounts.get_balance(account_id).await?;
        Ok(self.holdings.list(account_id).await?)
    }

    /// Totals across an account's open holdings.
    pub async fn portfolio(&self, account_id: AccountId) -> Result<PortfolioSummary, LedgerError> {
        let holdings = self.holdings(account_id).await?;
        Ok(PortfolioSummary::from_holdings(&holdings))
    }

    // ========== Balance Primitives ==========

    /// Adds `amount` to a balance through the retrying conditional write.
    async fn credit(
        &self,
        operation: &'static str,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        self.retry
            .run(operation, move || async move {
                let balance = self.accounts.get_balance(account_id).await?;
                ensure_fits(balance, amount)?;
                let new_balance = self
                    .accounts
                    .apply_balance_delta(account_id, amount, balance)
                    .await?;
                Ok::<_, Attempt>(new_balance)
            })
            .await
    }

    /// Subtracts `amount` from a balance, refusing to go below zero.
    async fn debit(
        &self,
        operation: &'static str,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        self.retry
            .run(operation, move || async move {
                let balance = self.accounts.get_balance(account_id).await?;
                if amount > balance {
                    debug!(%balance, %amount, "insufficient funds");
                    return Err(Attempt::Fail(LedgerError::InsufficientFunds {
                        account_id,
                        available: balance,
                        requested: amount,
                    }));
                }
                let new_balance = self
                    .accounts
                    .apply_balance_delta(account_id, -amount, balance)
                    .await?;
                Ok::<_, Attempt>(new_balance)
            })
            .await
    }

    /// Moves `amount` between two accounts in one batch write. Used to undo
    /// a transfer whose legs could not be recorded.
    async fn move_balance(
        &self,
        operation: &'static str,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        self.retry
            .run(operation, move || async move {
                let available = self.accounts.get_balance(from_account_id).await?;
                if amount > available {
                    return Err(Attempt::Fail(LedgerError::InsufficientFunds {
                        account_id: from_account_id,
                        available,
                        requested: amount,
                    }));
                }
                let recipient = self.accounts.get_balance(to_account_id).await?;
                ensure_fits(recipient, amount)?;
                self.accounts
                    .apply_balance_deltas(vec![
                        BalanceWrite::new(from_account_id, -amount, available),
                        BalanceWrite::new(to_account_id, amount, recipient),
                    ])
                    .await?;
                Ok::<_, Attempt>(())
            })
            .await
    }
}

/// Folds the outcome of a reversal into the error the caller sees.
fn compensated(
    operation: &'static str,
    cause: LedgerError,
    undo: Result<(), LedgerError>,
) -> LedgerError {
    match undo {
        Ok(()) => {
            warn!(operation, error = %cause, "partial write reversed");
            cause
        }
        Err(undo_err) => {
            error!(
                operation,
                error = %cause,
                compensation_error = %undo_err,
                "partial write could not be reversed"
            );
            LedgerError::CompensationFailed {
                operation,
                cause: cause.to_string(),
                compensation: undo_err.to_string(),
            }
        }
    }
}

fn ensure_positive(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount { field, value })
    }
}

/// Rejects a credit whose resulting balance would not be representable.
fn ensure_fits(balance: Decimal, amount: Decimal) -> Result<(), LedgerError> {
    if balance.checked_add(amount).is_some() {
        Ok(())
    } else {
        debug!(%balance, %amount, "credit would overflow balance");
        Err(LedgerError::InvalidAmount {
            field: "amount",
            value: amount,
        })
    }
}

/// `shares * price`, or `InvalidAmount` when the product is out of range.
fn order_value(shares: Decimal, price: Decimal) -> Result<Decimal, LedgerError> {
    shares
        .checked_mul(price)
        .ok_or(LedgerError::InvalidAmount {
            field: "shares",
            value: shares,
        })
}

fn describe(description: &str, kind: TransactionKind) -> String {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        kind.default_description().to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_symbol(symbol: &str) -> Result<String, LedgerError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(LedgerError::InvalidSymbol);
    }
    Ok(symbol.to_string())
}
