//! Holding lots and their valuation.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use greatbank_shared::types::{AccountId, HoldingId};

/// Decimal places kept on percentage figures.
const PERCENT_DP: u32 = 2;

/// Type of instrument a holding is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Common stock.
    Stock,
    /// Bond.
    Bond,
    /// Mutual fund.
    MutualFund,
    /// Exchange-traded fund.
    Etf,
}

impl InstrumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Bond => "bond",
            Self::MutualFund => "mutual_fund",
            Self::Etf => "etf",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stock" => Some(Self::Stock),
            "bond" => Some(Self::Bond),
            "mutual_fund" => Some(Self::MutualFund),
            "etf" => Some(Self::Etf),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single purchased lot.
///
/// `shares` is positive for as long as the holding exists. A sale that
/// exhausts it deletes the holding instead of storing zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Unique identifier.
    pub id: HoldingId,
    /// Cash account that paid for the lot.
    pub account_id: AccountId,
    /// Instrument type.
    pub instrument_kind: InstrumentKind,
    /// Ticker symbol, trimmed but otherwise as entered.
    pub symbol: String,
    /// Shares still held.
    pub shares: Decimal,
    /// Price per share paid at purchase. Never changes.
    pub purchase_price: Decimal,
    /// Latest known price per share.
    pub current_price: Decimal,
    /// When the lot was bought.
    pub purchased_at: DateTime<Utc>,
}

impl Holding {
    /// Opens a lot bought at `price`; current price starts equal to it.
    #[must_use]
    pub fn purchase(
        account_id: AccountId,
        instrument_kind: InstrumentKind,
        symbol: impl Into<String>,
        shares: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id: HoldingId::new(),
            account_id,
            instrument_kind,
            symbol: symbol.into(),
            shares,
            purchase_price: price,
            current_price: price,
            purchased_at: Utc::now(),
        }
    }

    /// `shares * current_price`.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.shares * self.current_price
    }

    /// `shares * purchase_price`.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.shares * self.purchase_price
    }

    /// Unrealised gain (positive) or loss (negative).
    #[must_use]
    pub fn gain_loss(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }

    /// Gain or loss as a percentage of cost basis, banker's-rounded to two
    /// places. `None` when the cost basis is zero.
    #[must_use]
    pub fn gain_loss_percent(&self) -> Option<Decimal> {
        let cost = self.cost_basis();
        if cost.is_zero() {
            return None;
        }
        let percent = self.gain_loss() / cost * Decimal::ONE_HUNDRED;
        Some(percent.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointNearestEven))
    }
}
