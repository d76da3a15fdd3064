//! Holding book.

use std::cmp::Reverse;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tracing::debug;

use greatbank_core::{Holding, HoldingBook, StoreError};
use greatbank_shared::types::{AccountId, HoldingId};

/// Open holdings keyed by id. A closed holding is removed from the map.
#[derive(Default)]
pub struct MemoryHoldingBook {
    holdings: DashMap<HoldingId, Holding>,
}

impl MemoryHoldingBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open holdings across all accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Returns true when no holding is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

#[async_trait]
impl HoldingBook for MemoryHoldingBook {
    async fn create(&self, holding: Holding) -> Result<HoldingId, StoreError> {
        match self.holdings.entry(holding.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                entity: "holding",
                key: holding.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let id = holding.id;
                slot.insert(holding);
                Ok(id)
            }
        }
    }

    async fn get(&self, holding_id: HoldingId) -> Result<Holding, StoreError> {
        self.holdings
            .get(&holding_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::HoldingNotFound(holding_id))
    }

    async fn reduce_or_close(
        &self,
        holding_id: HoldingId,
        shares_to_remove: Decimal,
    ) -> Result<Decimal, StoreError> {
        let Entry::Occupied(mut slot) = self.holdings.entry(holding_id) else {
            return Err(StoreError::HoldingNotFound(holding_id));
        };

        let available = slot.get().shares;
        if shares_to_remove > available {
            return Err(StoreError::InsufficientShares {
                holding_id,
                available,
                requested: shares_to_remove,
            });
        }

        let remaining = available - shares_to_remove;
        if remaining.is_zero() {
            slot.remove();
            debug!(%holding_id, "holding closed");
        } else {
            slot.get_mut().shares = remaining;
        }
        Ok(remaining)
    }

    async fn list(&self, account_id: AccountId) -> Result<Vec<Holding>, StoreError> {
        let mut owned: Vec<Holding> = self
            .holdings
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by_key(|h| Reverse((h.purchased_at, h.id)));
        Ok(owned)
    }

    async fn restore(&self, snapshot: Holding, shares: Decimal) -> Result<Decimal, StoreError> {
        match self.holdings.entry(snapshot.id) {
            Entry::Occupied(mut slot) => {
                let holding = slot.get_mut();
                holding.shares += shares;
                Ok(holding.shares)
            }
            Entry::Vacant(slot) => {
                debug!(holding_id = %snapshot.id, "reopening closed holding");
                slot.insert(Holding { shares, ..snapshot });
                Ok(shares)
            }
        }
    }

    async fn set_current_price(
        &self,
        holding_id: HoldingId,
        price: Decimal,
    ) -> Result<(), StoreError> {
        let mut holding = self
            .holdings
            .get_mut(&holding_id)
            .ok_or(StoreError::HoldingNotFound(holding_id))?;
        holding.current_price = price;
        Ok(())
    }
}
