//! Applying externally sourced prices to holdings.
//!
//! Prices are always supplied by the caller. Nothing here fetches or
//! simulates market data.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use greatbank_shared::types::HoldingId;

use crate::ledger::LedgerError;
use crate::store::{HoldingBook, StoreError};

/// A new price for one holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Holding to reprice.
    pub holding_id: HoldingId,
    /// New price per share.
    pub price: Decimal,
}

/// Writes quoted prices onto holdings.
pub struct PriceUpdater<H> {
    holdings: Arc<H>,
}

impl<H: HoldingBook> PriceUpdater<H> {
    /// Creates an updater over a holding book.
    #[must_use]
    pub fn new(holdings: Arc<H>) -> Self {
        Self { holdings }
    }

    /// Applies every quote and returns how many holdings were repriced.
    ///
    /// Quotes for holdings that no longer exist (sold since the quote was
    /// taken) are skipped. All prices are validated before any is written.
    pub async fn apply(&self, quotes: &[PriceQuote]) -> Result<usize, LedgerError> {
        if let Some(bad) = quotes.iter().find(|q| q.price <= Decimal::ZERO) {
            return Err(LedgerError::InvalidAmount {
                field: "price",
                value: bad.price,
            });
        }

        let mut updated = 0;
        for quote in quotes {
            match self
                .holdings
                .set_current_price(quote.holding_id, quote.price)
                .await
            {
                Ok(()) => updated += 1,
                Err(StoreError::HoldingNotFound(id)) => {
                    debug!(holding_id = %id, "skipping price for closed holding");
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(quotes = quotes.len(), updated, "holding prices updated");
        Ok(updated)
    }
}
