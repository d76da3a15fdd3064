//! Property-based tests for holding valuation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use greatbank_shared::types::AccountId;

use super::holding::{Holding, InstrumentKind};
use super::portfolio::PortfolioSummary;

/// Strategy for share counts (0.001 to 10,000.000).
fn share_count() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|milli| Decimal::new(milli, 3))
}

/// Strategy for prices (0.01 to 10,000.00).
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn lot(shares: Decimal, bought: Decimal, now: Decimal) -> Holding {
    let mut holding = Holding::purchase(AccountId::new(), InstrumentKind::Stock, "TEST", shares, bought);
    holding.current_price = now;
    holding
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Market value splits exactly into cost basis plus gain/loss.
    #[test]
    fn prop_value_decomposes(shares in share_count(), bought in price(), now in price()) {
        let holding = lot(shares, bought, now);
        prop_assert_eq!(holding.market_value(), holding.cost_basis() + holding.gain_loss());
    }

    /// The sign of the percentage follows the price move.
    #[test]
    fn prop_percent_sign_follows_price(shares in share_count(), bought in price(), now in price()) {
        let holding = lot(shares, bought, now);
        let percent = holding.gain_loss_percent().unwrap();
        if now > bought {
            prop_assert!(percent >= Decimal::ZERO);
        } else if now < bought {
            prop_assert!(percent <= Decimal::ZERO);
        } else {
            prop_assert_eq!(percent, Decimal::ZERO);
        }
    }

    /// Portfolio totals equal the sum of the individual lots.
    #[test]
    fn prop_portfolio_totals_are_sums(
        lots in prop::collection::vec((share_count(), price(), price()), 0..12)
    ) {
        let holdings: Vec<Holding> = lots.into_iter().map(|(s, b, n)| lot(s, b, n)).collect();
        let summary = PortfolioSummary::from_holdings(&holdings);

        let value: Decimal = holdings.iter().map(Holding::market_value).sum();
        let cost: Decimal = holdings.iter().map(Holding::cost_basis).sum();
        prop_assert_eq!(summary.holdings_count, holdings.len());
        prop_assert_eq!(summary.total_market_value, value);
        prop_assert_eq!(summary.total_gain_loss, value - cost);
    }
}
