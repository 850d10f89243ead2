//! Main ledger orchestrator that coordinates accounts, balances and transactions

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classifier::{Category, Classifier};
use crate::config::LedgerConfig;
use crate::ledger::{
    hierarchy, AccountManager, BalanceCalculator, TransactionManager, UpdateOutcome,
};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all bookkeeping operations
pub struct Ledger<S: LedgerStorage> {
    account_manager: AccountManager<S>,
    transaction_manager: TransactionManager<S>,
    balance_calculator: BalanceCalculator<S>,
    config: LedgerConfig,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default settings
    pub fn new(storage: S) -> Self {
        let config = LedgerConfig::default();
        Self {
            account_manager: AccountManager::new(storage.clone()),
            transaction_manager: TransactionManager::new(storage.clone(), config.clone()),
            balance_calculator: BalanceCalculator::new(storage, config.default_currency.clone()),
            config,
        }
    }

    /// Create a new ledger with explicit configuration
    pub fn with_config(storage: S, config: LedgerConfig) -> LedgerResult<Self> {
        let account_validator = DefaultAccountValidator {
            max_name_length: config.max_account_name_length,
        };
        Self::with_validators(
            storage,
            config,
            Box::new(account_validator),
            Box::new(DefaultTransactionValidator),
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        transaction_validator: Box<dyn TransactionValidator>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            transaction_manager: TransactionManager::with_validator(
                storage.clone(),
                config.clone(),
                transaction_validator,
            ),
            balance_calculator: BalanceCalculator::new(storage, config.default_currency.clone()),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        self.transaction_manager.classifier()
    }

    // Account operations
    /// Create an account directly under the root for its type
    pub async fn create_account(
        &mut self,
        account_type: AccountType,
        name: &str,
        currency: Option<&str>,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_account(account_type, name, currency)
            .await
    }

    /// Create an account below an existing one
    pub async fn create_subaccount(
        &mut self,
        parent_id: AccountId,
        name: &str,
        currency: Option<&str>,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_subaccount(parent_id, name, currency)
            .await
    }

    /// Create all missing accounts along a full path
    pub async fn create_account_path(&mut self, path: &str) -> LedgerResult<Account> {
        self.account_manager.create_account_path(path).await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    pub async fn get_account_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account_by_name(name).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .list_accounts_by_type(account_type)
            .await
    }

    pub async fn set_account_hidden(
        &mut self,
        account_id: AccountId,
        hidden: bool,
    ) -> LedgerResult<()> {
        self.account_manager.set_hidden(account_id, hidden).await
    }

    pub async fn set_account_description(
        &mut self,
        account_id: AccountId,
        description: &str,
    ) -> LedgerResult<()> {
        self.account_manager
            .set_description(account_id, description)
            .await
    }

    /// Delete an account
    pub async fn delete_account(&mut self, account_id: AccountId) -> LedgerResult<()> {
        self.account_manager.delete_account(account_id).await
    }

    /// The account and its surviving ancestors, root first
    pub async fn account_path(&self, account_id: AccountId) -> LedgerResult<Vec<Account>> {
        self.account_manager.account_path(account_id).await
    }

    // Balance operations
    /// Sum of all splits on an account
    pub async fn account_balance(&self, account_id: AccountId) -> LedgerResult<i64> {
        self.balance_calculator.account_balance(account_id).await
    }

    pub async fn subtree_balance(&self, account_id: AccountId) -> LedgerResult<Money> {
        self.balance_calculator.subtree_balance(account_id).await
    }

    pub async fn balances(&self, include_hidden: bool) -> LedgerResult<Vec<AccountBalance>> {
        self.balance_calculator.balances(include_hidden).await
    }

    // Transaction operations
    /// Record a new transaction
    pub async fn create_transaction(
        &mut self,
        input: TransactionInput,
    ) -> LedgerResult<TransactionId> {
        self.transaction_manager.create_transaction(input).await
    }

    /// Get a transaction by ID
    pub async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.transaction_manager.get_transaction(id).await
    }

    pub async fn list_splits(&self, id: TransactionId) -> LedgerResult<Vec<Split>> {
        self.transaction_manager.list_splits(id).await
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> LedgerResult<Option<Transaction>> {
        self.transaction_manager
            .find_by_external_id(external_id)
            .await
    }

    /// Delete a transaction
    pub async fn delete_transaction(&mut self, id: TransactionId) -> LedgerResult<()> {
        self.transaction_manager.delete_transaction(id).await
    }

    pub async fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<()> {
        self.transaction_manager.set_status(id, status).await
    }

    pub async fn set_status_code(&mut self, id: TransactionId, code: i64) -> LedgerResult<()> {
        self.transaction_manager.set_status_code(id, code).await
    }

    /// Atomically replace a transaction's header and split list
    pub async fn update_complete(
        &mut self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> LedgerResult<UpdateOutcome> {
        self.transaction_manager.update_complete(id, update).await
    }

    /// Swap the account of one leg of a two-split transaction
    pub async fn swap_account(
        &mut self,
        id: TransactionId,
        split_id: SplitId,
        new_account_id: AccountId,
    ) -> LedgerResult<UpdateOutcome> {
        self.transaction_manager
            .swap_account(id, split_id, new_account_id)
            .await
    }

    /// Set the opening balance of an account
    ///
    /// The balancing line is booked on the configured opening-balance
    /// equity account, which is created on first use. Accounts created
    /// here are removed again when the opening batch is rejected.
    pub async fn record_opening_balance(
        &mut self,
        account_name: &str,
        amount: i64,
    ) -> LedgerResult<TransactionId> {
        let account = self
            .account_manager
            .get_account_by_name(account_name.trim())
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_name.to_string()))?;

        let equity_name = self.config.opening_balance_account.clone();
        let mut created = Vec::new();
        let equity = match self.account_manager.get_account_by_name(&equity_name).await? {
            Some(existing) => existing,
            None => {
                let (account_type, segments) = hierarchy::parse_path(&equity_name)?;
                let mut name = account_type.root_name().to_string();
                for segment in segments {
                    name = hierarchy::full_name(&name, segment);
                    if !self.account_manager.storage.account_exists(&name).await? {
                        created.push(name.clone());
                    }
                }
                self.account_manager
                    .create_account_path(&equity_name)
                    .await?
            }
        };

        let result = self
            .transaction_manager
            .apply_opening_balance(&account, &equity, amount)
            .await;
        if result.is_err() {
            self.remove_accounts(&created).await;
        }
        result
    }

    /// Best-effort removal of freshly created accounts, deepest first
    async fn remove_accounts(&mut self, names: &[String]) {
        for name in names.iter().rev() {
            let removed = match self.account_manager.get_account_by_name(name).await {
                Ok(Some(account)) => self.account_manager.delete_account(account.id).await,
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            };
            if let Err(err) = removed {
                warn!(account = %name, error = %err, "could not remove opening balance account");
            }
        }
    }

    // Read paths
    pub async fn transaction_detail(&self, id: TransactionId) -> LedgerResult<TransactionDetail> {
        self.transaction_manager.transaction_detail(id).await
    }

    /// All transactions, newest first, with category and display fields
    pub async fn list_transaction_summaries(&self) -> LedgerResult<Vec<TransactionSummary>> {
        self.transaction_manager.list_transaction_summaries().await
    }

    pub async fn account_register(&self, account_id: AccountId) -> LedgerResult<Vec<RegisterEntry>> {
        self.transaction_manager.account_register(account_id).await
    }

    /// Category of an arbitrary split set
    pub fn classify(&self, splits: &[SplitDetail]) -> Category {
        self.classifier().classify(splits)
    }

    /// Validate the integrity of the ledger
    pub async fn validate_integrity(&self) -> LedgerResult<LedgerIntegrityReport> {
        let mut issues = Vec::new();
        let mut split_total: i128 = 0;

        let transactions = self.account_manager.storage.list_transactions().await?;
        for transaction in &transactions {
            let splits = self
                .account_manager
                .storage
                .list_splits(transaction.id)
                .await?;

            if splits.len() < 2 {
                issues.push(format!(
                    "Transaction {} has {} split(s)",
                    transaction.id,
                    splits.len()
                ));
            }

            let total: i128 = splits.iter().map(|s| i128::from(s.amount)).sum();
            if total != 0 {
                issues.push(format!(
                    "Transaction {} is not balanced: splits sum to {}",
                    transaction.id, total
                ));
            }
            split_total += total;

            for split in &splits {
                if self
                    .account_manager
                    .get_account(split.account_id)
                    .await?
                    .is_none()
                {
                    issues.push(format!(
                        "Split {} of transaction {} references missing account {}",
                        split.id, transaction.id, split.account_id
                    ));
                }
            }
        }

        for issue in &issues {
            warn!(%issue, "ledger integrity issue");
        }

        Ok(LedgerIntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            transaction_count: transactions.len(),
            split_total,
        })
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub transaction_count: usize,
    /// Sum of every split in the ledger; zero for a consistent ledger
    pub split_total: i128,
}
