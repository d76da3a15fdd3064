//! Common types used across the application.

pub mod account_number;
pub mod id;

pub use account_number::{AccountNumber, AccountNumberError};
pub use id::*;
