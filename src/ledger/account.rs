//! Account management functionality

use std::collections::HashSet;
use tracing::{debug, info};

use crate::ledger::hierarchy;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_currency_code;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator::default()),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a top-level account directly under the root for its type
    pub async fn create_account(
        &mut self,
        account_type: AccountType,
        leaf: &str,
        currency: Option<&str>,
    ) -> LedgerResult<Account> {
        self.validator.validate_leaf_name(leaf)?;
        let name = hierarchy::full_name(account_type.root_name(), leaf);
        self.insert(name, account_type, None, currency).await
    }

    /// Create an account below `parent_id`, inheriting the parent's type
    pub async fn create_subaccount(
        &mut self,
        parent_id: AccountId,
        leaf: &str,
        currency: Option<&str>,
    ) -> LedgerResult<Account> {
        self.validator.validate_leaf_name(leaf)?;
        let parent = self.get_account_required(parent_id).await?;
        let name = hierarchy::full_name(&parent.name, leaf);
        self.insert(name, parent.account_type, Some(parent.id), currency)
            .await
    }

    /// Create every missing account along a full path such as
    /// `Assets:Bank:Checking` and return the last one
    pub async fn create_account_path(&mut self, path: &str) -> LedgerResult<Account> {
        let (account_type, segments) = hierarchy::parse_path(path)?;
        for segment in &segments {
            self.validator.validate_leaf_name(segment)?;
        }

        let mut name = account_type.root_name().to_string();
        let mut parent: Option<Account> = None;
        for segment in segments {
            name = hierarchy::full_name(&name, segment);
            let account = match self.storage.get_account_by_name(&name).await? {
                Some(existing) => existing,
                None => {
                    self.insert(
                        name.clone(),
                        account_type,
                        parent.as_ref().map(|p| p.id),
                        None,
                    )
                    .await?
                }
            };
            parent = Some(account);
        }

        parent.ok_or_else(|| LedgerError::InvalidName(path.to_string()))
    }

    async fn insert(
        &mut self,
        name: String,
        account_type: AccountType,
        parent_id: Option<AccountId>,
        currency: Option<&str>,
    ) -> LedgerResult<Account> {
        if let Some(code) = currency {
            validate_currency_code(code)?;
        }

        if self.storage.account_exists(&name).await? {
            return Err(LedgerError::DuplicateAccount(name));
        }

        let account = self
            .storage
            .insert_account(NewAccount {
                name,
                account_type,
                parent_id,
                currency: currency.map(str::to_string),
                description: String::new(),
                hidden: false,
            })
            .await?;

        info!(account_id = %account.id, name = %account.name, account_type = %account.account_type, "account created");
        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Get an account by its full name
    pub async fn get_account_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account_by_name(name).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    pub async fn set_hidden(&mut self, account_id: AccountId, hidden: bool) -> LedgerResult<()> {
        let mut account = self.get_account_required(account_id).await?;
        account.hidden = hidden;
        self.storage.update_account(&account).await
    }

    pub async fn set_description(
        &mut self,
        account_id: AccountId,
        description: &str,
    ) -> LedgerResult<()> {
        let mut account = self.get_account_required(account_id).await?;
        account.description = description.trim().to_string();
        self.storage.update_account(&account).await
    }

    /// Delete an account that has no splits and no children
    pub async fn delete_account(&mut self, account_id: AccountId) -> LedgerResult<()> {
        let account = self.get_account_required(account_id).await?;

        let split_count = self.storage.account_split_count(account_id).await?;
        self.validator
            .validate_account_deletion(&account, split_count)?;

        let accounts = self.storage.list_accounts(None).await?;
        if accounts.iter().any(|a| a.parent_id == Some(account_id)) {
            return Err(LedgerError::AccountInUse(format!(
                "{} has subaccounts",
                account.name
            )));
        }

        self.storage.delete_account(account_id).await?;
        info!(account_id = %account_id, name = %account.name, "account deleted");
        Ok(())
    }

    /// Ancestors of an account followed by the account itself
    ///
    /// A parent that no longer exists ends the walk, so the topmost
    /// surviving account is treated as a root.
    pub async fn account_path(&self, account_id: AccountId) -> LedgerResult<Vec<Account>> {
        let mut path = vec![self.get_account_required(account_id).await?];
        let mut seen = HashSet::from([account_id]);

        while let Some(parent_id) = path[0].parent_id {
            if !seen.insert(parent_id) {
                break;
            }
            match self.storage.get_account(parent_id).await? {
                Some(parent) => path.insert(0, parent),
                None => {
                    debug!(account_id = %account_id, parent_id = %parent_id, "parent account missing");
                    break;
                }
            }
        }

        Ok(path)
    }

    /// Direct children of an account
    pub async fn child_accounts(&self, parent_id: AccountId) -> LedgerResult<Vec<Account>> {
        let accounts = self.storage.list_accounts(None).await?;
        Ok(accounts
            .into_iter()
            .filter(|account| account.parent_id == Some(parent_id))
            .collect())
    }
}
