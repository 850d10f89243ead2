//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::ledger::hierarchy;
use crate::types::*;

/// Transaction header handed to storage for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub external_id: Option<String>,
    pub is_opening: bool,
}

/// Split data handed to storage for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSplit {
    pub account_id: AccountId,
    pub amount: i64,
    pub currency: String,
    pub memo: Option<String>,
}

/// Transaction a new split is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitTarget {
    Existing(TransactionId),
    /// The transaction inserted earlier in the same batch
    Inserted,
}

/// A single write against transactions or splits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    InsertTransaction(NewTransaction),
    UpdateHeader {
        id: TransactionId,
        timestamp: i64,
        description: String,
        status: TransactionStatus,
    },
    UpdateStatus {
        id: TransactionId,
        status: TransactionStatus,
    },
    /// Removes the transaction together with all of its splits
    DeleteTransaction(TransactionId),
    InsertSplit {
        target: SplitTarget,
        split: NewSplit,
    },
    /// Replaces account, amount, currency and memo of an existing split
    UpdateSplit(Split),
    DeleteSplit(SplitId),
}

/// Identifiers assigned while applying a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub transaction_id: Option<TransactionId>,
    /// Ids of inserted splits, in op order
    pub split_ids: Vec<SplitId>,
}

/// Storage abstraction for the ledger system
///
/// Identifiers are assigned by the backend starting at 1 and are never
/// reused. Writes touching transactions or splits go through [`apply`],
/// which must apply every op of the batch or none of them.
///
/// [`apply`]: LedgerStorage::apply
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert an account and return it with its assigned id
    async fn insert_account(&mut self, account: NewAccount) -> LedgerResult<Account>;

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>>;

    /// Look an account up by its unique full name, ignoring ASCII case
    async fn get_account_by_name(&self, name: &str) -> LedgerResult<Option<Account>>;

    /// Whether a full name is taken; names differing only in ASCII case collide
    async fn account_exists(&self, name: &str) -> LedgerResult<bool>;

    /// List all accounts, optionally filtered by type, ordered by name
    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>>;

    /// Update presentation fields of an account
    async fn update_account(&mut self, account: &Account) -> LedgerResult<()>;

    async fn delete_account(&mut self, account_id: AccountId) -> LedgerResult<()>;

    /// Sum of all split amounts referencing the account, zero when none exist
    async fn account_split_sum(&self, account_id: AccountId) -> LedgerResult<i64>;

    async fn account_split_count(&self, account_id: AccountId) -> LedgerResult<usize>;

    async fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> LedgerResult<Option<Transaction>>;

    async fn find_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> LedgerResult<Option<Transaction>>;

    /// The transaction flagged as holding opening balances, if seeded
    async fn opening_transaction(&self) -> LedgerResult<Option<Transaction>>;

    async fn list_transactions(&self) -> LedgerResult<Vec<Transaction>>;

    /// Splits of a transaction ordered by id
    async fn list_splits(&self, transaction_id: TransactionId) -> LedgerResult<Vec<Split>>;

    /// Splits referencing an account ordered by id
    async fn list_account_splits(&self, account_id: AccountId) -> LedgerResult<Vec<Split>>;

    /// Apply a batch of writes atomically
    async fn apply(&mut self, ops: Vec<WriteOp>) -> LedgerResult<BatchOutcome>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate a single name segment before an account is created
    fn validate_leaf_name(&self, name: &str) -> LedgerResult<()>;

    /// Validate account deletion given how many splits still reference it
    fn validate_account_deletion(&self, account: &Account, split_count: usize) -> LedgerResult<()>;
}

/// Trait for implementing custom transaction validation rules
pub trait TransactionValidator: Send + Sync {
    fn validate_description(&self, description: &str) -> LedgerResult<()>;

    /// Validate the signed split amounts of a transaction
    fn validate_amounts(&self, amounts: &[i64]) -> LedgerResult<()>;
}

/// Default account validator enforcing the naming rules
pub struct DefaultAccountValidator {
    pub max_name_length: usize,
}

impl Default for DefaultAccountValidator {
    fn default() -> Self {
        Self {
            max_name_length: hierarchy::MAX_NAME_LENGTH,
        }
    }
}

impl AccountValidator for DefaultAccountValidator {
    fn validate_leaf_name(&self, name: &str) -> LedgerResult<()> {
        hierarchy::validate_name_with_limit(name, self.max_name_length)
    }

    fn validate_account_deletion(&self, account: &Account, split_count: usize) -> LedgerResult<()> {
        if split_count > 0 {
            return Err(LedgerError::AccountInUse(format!(
                "{} is referenced by {} split(s)",
                account.name, split_count
            )));
        }
        Ok(())
    }
}

/// Default transaction validator with the double-entry rules
pub struct DefaultTransactionValidator;

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_description(&self, _description: &str) -> LedgerResult<()> {
        Ok(())
    }

    fn validate_amounts(&self, amounts: &[i64]) -> LedgerResult<()> {
        if amounts.len() < 2 {
            return Err(LedgerError::TooFewSplits(amounts.len()));
        }

        let total = split_total(amounts);
        if total != 0 {
            return Err(LedgerError::Unbalanced { total });
        }

        Ok(())
    }
}

/// Exact signed sum of split amounts
pub fn split_total(amounts: &[i64]) -> i128 {
    amounts.iter().map(|amount| i128::from(*amount)).sum()
}

/// Signed sum of split amounts that must itself fit a split amount
pub fn checked_total(amounts: &[i64]) -> LedgerResult<i64> {
    i64::try_from(split_total(amounts))
        .map_err(|_| LedgerError::Validation("Split amounts overflow".to_string()))
}
