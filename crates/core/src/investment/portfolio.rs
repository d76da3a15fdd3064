//! Portfolio totals across an account's holdings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::holding::Holding;

/// Aggregate valuation of a set of holdings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Number of open lots.
    pub holdings_count: usize,
    /// Sum of market values.
    pub total_market_value: Decimal,
    /// Sum of cost bases.
    pub total_cost_basis: Decimal,
    /// `total_market_value - total_cost_basis`.
    pub total_gain_loss: Decimal,
}

impl PortfolioSummary {
    /// Totals the given holdings.
    #[must_use]
    pub fn from_holdings(holdings: &[Holding]) -> Self {
        let total_market_value: Decimal = holdings.iter().map(Holding::market_value).sum();
        let total_cost_basis: Decimal = holdings.iter().map(Holding::cost_basis).sum();

        Self {
            holdings_count: holdings.len(),
            total_market_value,
            total_cost_basis,
            total_gain_loss: total_market_value - total_cost_basis,
        }
    }
}
