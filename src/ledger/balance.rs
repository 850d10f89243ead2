//! Account balances derived from splits
//!
//! Nothing is cached: every balance is recomputed from the stored splits.

use crate::traits::*;
use crate::types::*;

pub struct BalanceCalculator<S: LedgerStorage> {
    storage: S,
    default_currency: String,
}

impl<S: LedgerStorage> BalanceCalculator<S> {
    pub fn new(storage: S, default_currency: impl Into<String>) -> Self {
        Self {
            storage,
            default_currency: default_currency.into(),
        }
    }

    /// Sum of all split amounts on the account; zero when it has none
    pub async fn account_balance(&self, account_id: AccountId) -> LedgerResult<i64> {
        if self.storage.get_account(account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }
        self.storage.account_split_sum(account_id).await
    }

    /// Balance of the account plus every account below it
    pub async fn subtree_balance(&self, account_id: AccountId) -> LedgerResult<Money> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let prefix = format!("{}{}", account.name, ACCOUNT_SEPARATOR);
        let mut total = self.storage.account_split_sum(account.id).await?;
        for descendant in self
            .storage
            .list_accounts(Some(account.account_type))
            .await?
            .iter()
            .filter(|a| a.name.starts_with(&prefix))
        {
            let balance = self.storage.account_split_sum(descendant.id).await?;
            total = total
                .checked_add(balance)
                .ok_or_else(|| LedgerError::Storage("Balance overflow".to_string()))?;
        }

        Ok(Money::new(
            total,
            account.currency_or(&self.default_currency),
        ))
    }

    /// Every account with its balance, ordered by name
    pub async fn balances(&self, include_hidden: bool) -> LedgerResult<Vec<AccountBalance>> {
        let accounts = self.storage.list_accounts(None).await?;
        let mut balances = Vec::with_capacity(accounts.len());

        for account in accounts {
            if account.hidden && !include_hidden {
                continue;
            }
            let amount = self.storage.account_split_sum(account.id).await?;
            let balance = Money::new(amount, account.currency_or(&self.default_currency));
            balances.push(AccountBalance { account, balance });
        }

        Ok(balances)
    }
}
