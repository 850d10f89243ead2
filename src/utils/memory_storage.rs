//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Clone, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    splits: BTreeMap<SplitId, Split>,
    last_account_id: i64,
    last_transaction_id: i64,
    last_split_id: i64,
}

impl State {
    fn apply_op(
        &mut self,
        op: WriteOp,
        outcome: &mut BatchOutcome,
    ) -> LedgerResult<()> {
        match op {
            WriteOp::InsertTransaction(new) => {
                if let Some(external_id) = &new.external_id {
                    if self
                        .transactions
                        .values()
                        .any(|t| t.external_id.as_deref() == Some(external_id.as_str()))
                    {
                        return Err(LedgerError::DuplicateExternalId(external_id.clone()));
                    }
                }
                self.last_transaction_id += 1;
                let id = TransactionId(self.last_transaction_id);
                self.transactions.insert(
                    id,
                    Transaction {
                        id,
                        timestamp: new.timestamp,
                        description: new.description,
                        status: new.status,
                        external_id: new.external_id,
                        is_opening: new.is_opening,
                    },
                );
                outcome.transaction_id = Some(id);
            }
            WriteOp::UpdateHeader {
                id,
                timestamp,
                description,
                status,
            } => {
                let transaction = self
                    .transactions
                    .get_mut(&id)
                    .ok_or(LedgerError::TransactionNotFound(id))?;
                transaction.timestamp = timestamp;
                transaction.description = description;
                transaction.status = status;
            }
            WriteOp::UpdateStatus { id, status } => {
                self.transactions
                    .get_mut(&id)
                    .ok_or(LedgerError::TransactionNotFound(id))?
                    .status = status;
            }
            WriteOp::DeleteTransaction(id) => {
                self.transactions
                    .remove(&id)
                    .ok_or(LedgerError::TransactionNotFound(id))?;
                self.splits.retain(|_, split| split.transaction_id != id);
            }
            WriteOp::InsertSplit { target, split } => {
                let transaction_id = match target {
                    SplitTarget::Existing(id) => id,
                    SplitTarget::Inserted => outcome.transaction_id.ok_or_else(|| {
                        LedgerError::Storage(
                            "No transaction was inserted earlier in this batch".to_string(),
                        )
                    })?,
                };
                if !self.transactions.contains_key(&transaction_id) {
                    return Err(LedgerError::TransactionNotFound(transaction_id));
                }
                if !self.accounts.contains_key(&split.account_id) {
                    return Err(LedgerError::AccountNotFound(split.account_id.to_string()));
                }
                self.last_split_id += 1;
                let id = SplitId(self.last_split_id);
                self.splits.insert(
                    id,
                    Split {
                        id,
                        transaction_id,
                        account_id: split.account_id,
                        amount: split.amount,
                        currency: split.currency,
                        memo: split.memo,
                    },
                );
                outcome.split_ids.push(id);
            }
            WriteOp::UpdateSplit(split) => {
                if !self.accounts.contains_key(&split.account_id) {
                    return Err(LedgerError::AccountNotFound(split.account_id.to_string()));
                }
                let stored = self
                    .splits
                    .get_mut(&split.id)
                    .filter(|s| s.transaction_id == split.transaction_id)
                    .ok_or(LedgerError::SplitNotFound(split.id))?;
                stored.account_id = split.account_id;
                stored.amount = split.amount;
                stored.currency = split.currency;
                stored.memo = split.memo;
            }
            WriteOp::DeleteSplit(id) => {
                self.splits
                    .remove(&id)
                    .ok_or(LedgerError::SplitNotFound(id))?;
            }
        }
        Ok(())
    }
}

/// In-memory storage implementation for testing and development
///
/// Batches are applied to a copy of the state that replaces the live
/// state only once every op has succeeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<State>>,
    fail_at: Arc<Mutex<Option<usize>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next batch fail when it reaches the op at `index`
    pub fn fail_batch_at(&self, index: usize) {
        if let Ok(mut fail_at) = self.fail_at.lock() {
            *fail_at = Some(index);
        }
    }

    /// Number of stored transactions and splits
    pub fn row_counts(&self) -> LedgerResult<(usize, usize)> {
        let state = self.read()?;
        Ok((state.transactions.len(), state.splits.len()))
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        *self.write()? = State::default();
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("Storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| LedgerError::Storage("Storage lock poisoned".to_string()))
    }

    fn take_failure(&self) -> Option<usize> {
        self.fail_at.lock().ok().and_then(|mut f| f.take())
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn insert_account(&mut self, account: NewAccount) -> LedgerResult<Account> {
        let mut state = self.write()?;
        if state
            .accounts
            .values()
            .any(|a| a.name.eq_ignore_ascii_case(&account.name))
        {
            return Err(LedgerError::DuplicateAccount(account.name));
        }
        state.last_account_id += 1;
        let stored = Account {
            id: AccountId(state.last_account_id),
            name: account.name,
            account_type: account.account_type,
            parent_id: account.parent_id,
            currency: account.currency,
            description: account.description,
            hidden: account.hidden,
        };
        state.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&account_id).cloned())
    }

    async fn get_account_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn account_exists(&self, name: &str) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .accounts
            .values()
            .any(|a| a.name.eq_ignore_ascii_case(name)))
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut state = self.write()?;
        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(LedgerError::AccountNotFound(account.id.to_string())),
        }
    }

    async fn delete_account(&mut self, account_id: AccountId) -> LedgerResult<()> {
        if self.write()?.accounts.remove(&account_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::AccountNotFound(account_id.to_string()))
        }
    }

    async fn account_split_sum(&self, account_id: AccountId) -> LedgerResult<i64> {
        let state = self.read()?;
        state
            .splits
            .values()
            .filter(|s| s.account_id == account_id)
            .try_fold(0i64, |acc, s| acc.checked_add(s.amount))
            .ok_or_else(|| LedgerError::Storage("Balance overflow".to_string()))
    }

    async fn account_split_count(&self, account_id: AccountId) -> LedgerResult<usize> {
        Ok(self
            .read()?
            .splits
            .values()
            .filter(|s| s.account_id == account_id)
            .count())
    }

    async fn get_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> LedgerResult<Option<Transaction>> {
        Ok(self.read()?.transactions.get(&transaction_id).cloned())
    }

    async fn find_transaction_by_external_id(
        &self,
        external_id: &str,
    ) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .values()
            .find(|t| t.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn opening_transaction(&self) -> LedgerResult<Option<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .values()
            .find(|t| t.is_opening)
            .cloned())
    }

    async fn list_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.read()?.transactions.values().cloned().collect())
    }

    async fn list_splits(&self, transaction_id: TransactionId) -> LedgerResult<Vec<Split>> {
        Ok(self
            .read()?
            .splits
            .values()
            .filter(|s| s.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn list_account_splits(&self, account_id: AccountId) -> LedgerResult<Vec<Split>> {
        Ok(self
            .read()?
            .splits
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn apply(&mut self, ops: Vec<WriteOp>) -> LedgerResult<BatchOutcome> {
        let fail_at = self.take_failure();
        let mut state = self.write()?;
        let mut staged = state.clone();
        let mut outcome = BatchOutcome::default();

        for (index, op) in ops.into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(LedgerError::Storage(format!(
                    "Injected failure at op {}",
                    index
                )));
            }
            staged.apply_op(op, &mut outcome)?;
        }

        *state = staged;
        Ok(outcome)
    }
}
