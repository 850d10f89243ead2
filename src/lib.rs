//! # Bookkeeping Core
//!
//! A personal double-entry bookkeeping library: a chart of accounts,
//! balanced multi-split transactions and a classifier that labels each
//! transaction for display.
//!
//! ## Features
//!
//! - **Double-entry bookkeeping**: every transaction has two or more splits summing to zero
//! - **Account hierarchy**: colon-delimited names under fixed roots per account type
//! - **Atomic edits**: a full transaction edit reconciles its split list in one batch
//! - **Status lifecycle**: pending, cleared and reconciled, with reconciled entries locked
//! - **Classification**: expense, income, transfer, deposit, withdrawal and opening balance
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bookkeeping_core::{patterns, AccountType, Category, Ledger};
//! use bookkeeping_core::utils::MemoryStorage;
//!
//! # async fn run() -> bookkeeping_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStorage::new());
//! let cash = ledger.create_account(AccountType::Asset, "Cash", None).await?;
//! let food = ledger.create_account(AccountType::Expense, "Food", None).await?;
//!
//! let lunch = patterns::expense("Lunch", &food.name, &cash.name, 1500)?;
//! let id = ledger.create_transaction(lunch).await?;
//!
//! assert_eq!(ledger.account_balance(cash.id).await?, -1500);
//! assert_eq!(ledger.transaction_detail(id).await?.category, Category::Expense);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use classifier::{Category, Classification, Classifier};
pub use config::LedgerConfig;
pub use ledger::*;
pub use reconciliation::ReconciliationPlan;
pub use traits::*;
pub use types::*;

// Re-export transaction patterns for convenience
pub use ledger::transaction::patterns;
