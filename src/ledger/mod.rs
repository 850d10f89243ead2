//! Ledger functionality: accounts, balances and transactions

pub mod account;
pub mod balance;
pub mod core;
pub mod hierarchy;
pub mod transaction;

pub use account::*;
pub use balance::*;
pub use core::*;
pub use transaction::*;
