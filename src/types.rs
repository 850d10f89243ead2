//! Core types and data structures for the bookkeeping engine

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the segments of a hierarchical account name
pub const ACCOUNT_SEPARATOR: char = ':';

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of an account, assigned by storage
    AccountId
);
id_type!(
    /// Identifier of a transaction, assigned by storage
    TransactionId
);
id_type!(
    /// Identifier of a split, assigned by storage
    SplitId
);

impl SplitId {
    /// Marker for a split that does not exist in storage yet
    pub const NEW: SplitId = SplitId(0);

    pub fn is_new(&self) -> bool {
        *self == Self::NEW
    }
}

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what you own (cash, bank balances, investments)
    Asset,
    /// Liabilities - what you owe (credit cards, loans)
    Liability,
    /// Equity - net worth, including opening balances
    Equity,
    /// Revenue - money earned (salary, interest)
    Revenue,
    /// Expenses - money spent
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    /// Name of the top-level segment every account of this type lives under
    pub fn root_name(&self) -> &'static str {
        match self {
            AccountType::Asset => "Assets",
            AccountType::Liability => "Liabilities",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expenses",
        }
    }

    /// Assets and liabilities are the accounts that hold actual money
    pub fn is_asset_or_liability(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Liability)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        };
        f.write_str(name)
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    /// Accepts both the singular type name and the plural root name
    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountType::Asset),
            "liability" | "liabilities" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" | "income" => Ok(AccountType::Revenue),
            "expense" | "expenses" => Ok(AccountType::Expense),
            _ => Err(LedgerError::InvalidType(code.to_string())),
        }
    }
}

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Cleared,
    /// Terminal: the transaction is locked against edits and deletion
    Reconciled,
}

impl TransactionStatus {
    /// Numeric code used by callers and storage (0, 1, 2)
    pub fn code(&self) -> i64 {
        match self {
            TransactionStatus::Pending => 0,
            TransactionStatus::Cleared => 1,
            TransactionStatus::Reconciled => 2,
        }
    }

    pub fn from_code(code: i64) -> LedgerResult<Self> {
        match code {
            0 => Ok(TransactionStatus::Pending),
            1 => Ok(TransactionStatus::Cleared),
            2 => Ok(TransactionStatus::Reconciled),
            other => Err(LedgerError::InvalidStatus(other)),
        }
    }

    pub fn is_locked(&self) -> bool {
        *self == TransactionStatus::Reconciled
    }
}

impl TryFrom<i64> for TransactionStatus {
    type Error = LedgerError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Cleared => "Cleared",
            TransactionStatus::Reconciled => "Reconciled",
        };
        f.write_str(name)
    }
}

/// An amount in minor currency units (cents) with its currency code
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Amount in major units, e.g. 1500 cents becomes 15.00
    pub fn to_decimal(&self) -> BigDecimal {
        BigDecimal::new(self.amount.into(), 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.to_decimal().with_scale(2);
        if self.currency.is_empty() {
            write!(f, "{}", value)
        } else {
            write!(f, "{} {}", value, self.currency)
        }
    }
}

/// Core account structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Full colon-separated path, e.g. `Assets:Bank:Checking`
    pub name: String,
    /// Fixed by the root the account was created under
    pub account_type: AccountType,
    /// Advisory only: a missing parent makes the account display as a root
    pub parent_id: Option<AccountId>,
    /// ISO-4217 style code; `None` means the ledger's default currency
    pub currency: Option<String>,
    pub description: String,
    pub hidden: bool,
}

impl Account {
    /// Last segment of the full name
    pub fn leaf_name(&self) -> &str {
        self.name
            .rsplit(ACCOUNT_SEPARATOR)
            .next()
            .unwrap_or(self.name.as_str())
    }

    /// Number of segments below the type root (`Assets:Bank` is 1)
    pub fn depth(&self) -> usize {
        self.name.matches(ACCOUNT_SEPARATOR).count()
    }

    /// Currency of the account, or `default` when none is set
    pub fn currency_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.currency.as_deref().unwrap_or(default)
    }
}

/// Account data handed to storage for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<AccountId>,
    pub currency: Option<String>,
    pub description: String,
    pub hidden: bool,
}

/// Transaction header; the splits are stored separately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    /// Correlation id for deduplicating imported transactions
    pub external_id: Option<String>,
    /// Set only on the seeded opening-balance transaction
    pub is_opening: bool,
}

impl Transaction {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// One signed line of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: SplitId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    /// Minor units; positive increases the asset/expense side
    pub amount: i64,
    pub currency: String,
    pub memo: Option<String>,
}

/// A split as supplied by callers creating a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInput {
    /// Full account name, e.g. `Expenses:Food`
    pub account: String,
    pub amount: i64,
    pub memo: Option<String>,
}

impl SplitInput {
    pub fn new(account: impl Into<String>, amount: i64) -> Self {
        Self {
            account: account.into(),
            amount,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Request to create a transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Zero means "now"
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub external_id: Option<String>,
    pub splits: Vec<SplitInput>,
}

/// A split line in an edit request; `id` is [`SplitId::NEW`] for added lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEdit {
    pub id: SplitId,
    pub account_id: AccountId,
    pub amount: i64,
    /// `None` resolves to the account's currency, then the default
    pub currency: Option<String>,
    pub memo: Option<String>,
}

impl SplitEdit {
    /// A line that does not exist yet
    pub fn added(account_id: AccountId, amount: i64) -> Self {
        Self {
            id: SplitId::NEW,
            account_id,
            amount,
            currency: None,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

impl From<&Split> for SplitEdit {
    fn from(split: &Split) -> Self {
        Self {
            id: split.id,
            account_id: split.account_id,
            amount: split.amount,
            currency: Some(split.currency.clone()),
            memo: split.memo.clone(),
        }
    }
}

/// Full replacement of a transaction's header and split list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    /// Zero keeps the stored timestamp
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub splits: Vec<SplitEdit>,
}

impl TransactionUpdate {
    /// Starts an update from the current state of a transaction
    pub fn from_existing(transaction: &Transaction, splits: &[Split]) -> Self {
        Self {
            timestamp: transaction.timestamp,
            description: transaction.description.clone(),
            status: transaction.status,
            splits: splits.iter().map(SplitEdit::from).collect(),
        }
    }
}

/// A split resolved for display, with its account attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDetail {
    pub id: SplitId,
    pub account_id: AccountId,
    pub account_name: String,
    /// `None` when the account no longer exists
    pub account_type: Option<AccountType>,
    pub amount: i64,
    pub currency: String,
    pub memo: Option<String>,
}

/// A transaction with resolved splits and its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub splits: Vec<SplitDetail>,
    pub category: crate::classifier::Category,
    pub display_account: Option<String>,
    pub display_amount: Money,
}

/// One row of a transaction listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub category: crate::classifier::Category,
    pub display_account: Option<String>,
    pub display_amount: Money,
}

/// Account with its derived balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: Account,
    pub balance: Money,
}

/// One line of an account register, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEntry {
    pub transaction_id: TransactionId,
    pub timestamp: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub split_id: SplitId,
    pub amount: i64,
    pub running_balance: i64,
}

/// Broad class of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any write was attempted
    Validation,
    NotFound,
    /// Reconciled or protected transaction
    Locked,
    /// Uniqueness or reference constraint
    Constraint,
    Storage,
}

/// Errors that can occur in the ledger system
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid account type: {0}")]
    InvalidType(String),
    #[error("Invalid account name: {0}")]
    InvalidName(String),
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("Invalid transaction status: {0} (expected 0, 1 or 2)")]
    InvalidStatus(i64),
    #[error("Transaction needs at least two splits, got {0}")]
    TooFewSplits(usize),
    #[error("Transaction is not balanced: splits sum to {total}")]
    Unbalanced { total: i128 },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("Split {0} does not belong to the transaction")]
    SplitNotFound(SplitId),
    #[error("Transaction {0} is reconciled and cannot be modified")]
    ReconciledLocked(TransactionId),
    #[error("Transaction {0} is already reconciled")]
    AlreadyReconciled(TransactionId),
    #[error("Transaction {0} holds the opening balances and cannot be modified or deleted")]
    ProtectedTransaction(TransactionId),
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),
    #[error("A transaction with external id '{0}' already exists")]
    DuplicateExternalId(String),
    #[error("Account {0} is still in use")]
    AccountInUse(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidType(_)
            | LedgerError::InvalidName(_)
            | LedgerError::InvalidCurrency(_)
            | LedgerError::InvalidStatus(_)
            | LedgerError::TooFewSplits(_)
            | LedgerError::Unbalanced { .. }
            | LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_)
            | LedgerError::TransactionNotFound(_)
            | LedgerError::SplitNotFound(_) => ErrorKind::NotFound,
            LedgerError::ReconciledLocked(_)
            | LedgerError::AlreadyReconciled(_)
            | LedgerError::ProtectedTransaction(_) => ErrorKind::Locked,
            LedgerError::DuplicateAccount(_)
            | LedgerError::DuplicateExternalId(_)
            | LedgerError::AccountInUse(_) => ErrorKind::Constraint,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TransactionStatus::from_code(0).unwrap(), TransactionStatus::Pending);
        assert_eq!(TransactionStatus::from_code(2).unwrap(), TransactionStatus::Reconciled);
        assert_eq!(
            TransactionStatus::try_from(3),
            Err(LedgerError::InvalidStatus(3))
        );
        assert_eq!(TransactionStatus::Cleared.code(), 1);
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("Assets".parse::<AccountType>().unwrap(), AccountType::Asset);
        assert_eq!("income".parse::<AccountType>().unwrap(), AccountType::Revenue);
        assert!(matches!(
            "stocks".parse::<AccountType>(),
            Err(LedgerError::InvalidType(_))
        ));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(1500, "USD").to_string(), "15.00 USD");
        assert_eq!(Money::new(-5, "EUR").to_string(), "-0.05 EUR");
        assert_eq!(Money::default().to_string(), "0.00");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LedgerError::Unbalanced { total: 5 }.kind(), ErrorKind::Validation);
        assert_eq!(
            LedgerError::ReconciledLocked(TransactionId(4)).kind(),
            ErrorKind::Locked
        );
        assert_eq!(
            LedgerError::DuplicateAccount("Assets:Cash".into()).kind(),
            ErrorKind::Constraint
        );
        assert!(LedgerError::Unbalanced { total: -250 }
            .to_string()
            .contains("-250"));
    }
}
