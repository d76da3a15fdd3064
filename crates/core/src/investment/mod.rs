//! Investment holdings.
//!
//! A holding is one purchased lot. Lots of the same symbol are never merged,
//! so every purchase opens a new holding and a sale acts on exactly one.

pub mod holding;
pub mod portfolio;
pub mod pricing;

#[cfg(test)]
mod valuation_props;

pub use holding::{Holding, InstrumentKind};
pub use portfolio::PortfolioSummary;
pub use pricing::{PriceQuote, PriceUpdater};
