//! Transaction processing and management

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::classifier::{eligible_accounts_for_role_swap, Classifier};
use crate::config::LedgerConfig;
use crate::reconciliation::ReconciliationPlan;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_currency_code;

/// Split ids touched by a full transaction edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub deleted: Vec<SplitId>,
    pub updated: Vec<SplitId>,
    pub inserted: Vec<SplitId>,
}

/// Transaction manager for handling transaction operations
pub struct TransactionManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn TransactionValidator>,
    config: LedgerConfig,
    classifier: Classifier,
}

fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl<S: LedgerStorage> TransactionManager<S> {
    /// Create a new transaction manager
    pub fn new(storage: S, config: LedgerConfig) -> Self {
        Self::with_validator(storage, config, Box::new(DefaultTransactionValidator))
    }

    /// Create a new transaction manager with custom validator
    pub fn with_validator(
        storage: S,
        config: LedgerConfig,
        validator: Box<dyn TransactionValidator>,
    ) -> Self {
        let classifier = Classifier::new(config.opening_balance_memo.clone());
        Self {
            storage,
            validator,
            config,
            classifier,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Record a new transaction and return its id
    ///
    /// Everything is validated before the header and splits are written
    /// in a single atomic batch.
    pub async fn create_transaction(
        &mut self,
        input: TransactionInput,
    ) -> LedgerResult<TransactionId> {
        let TransactionInput {
            timestamp,
            description,
            status,
            external_id,
            splits,
        } = input;

        self.validator.validate_description(&description)?;
        let amounts: Vec<i64> = splits.iter().map(|s| s.amount).collect();
        self.validator.validate_amounts(&amounts)?;

        let mut new_splits = Vec::with_capacity(splits.len());
        for split in splits {
            let account = self
                .storage
                .get_account_by_name(split.account.trim())
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(split.account.clone()))?;
            new_splits.push(NewSplit {
                account_id: account.id,
                amount: split.amount,
                currency: account
                    .currency_or(&self.config.default_currency)
                    .to_string(),
                memo: clean_text(split.memo),
            });
        }

        let external_id = clean_text(external_id);
        if let Some(external_id) = &external_id {
            if self
                .storage
                .find_transaction_by_external_id(external_id)
                .await?
                .is_some()
            {
                return Err(LedgerError::DuplicateExternalId(external_id.clone()));
            }
        }

        let timestamp = if timestamp == 0 {
            Utc::now().timestamp()
        } else {
            timestamp
        };

        let mut ops = Vec::with_capacity(new_splits.len() + 1);
        ops.push(WriteOp::InsertTransaction(NewTransaction {
            timestamp,
            description: description.trim().to_string(),
            status,
            external_id,
            is_opening: false,
        }));
        ops.extend(new_splits.into_iter().map(|split| WriteOp::InsertSplit {
            target: SplitTarget::Inserted,
            split,
        }));

        let outcome = self.storage.apply(ops).await?;
        let id = outcome.transaction_id.ok_or_else(|| {
            LedgerError::Storage("Storage did not assign a transaction id".to_string())
        })?;

        info!(transaction_id = %id, splits = outcome.split_ids.len(), %status, "transaction created");
        Ok(id)
    }

    /// Get a transaction by ID
    pub async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.storage.get_transaction(id).await
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn get_transaction_required(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.storage
            .get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> LedgerResult<Option<Transaction>> {
        self.storage
            .find_transaction_by_external_id(external_id.trim())
            .await
    }

    pub async fn list_splits(&self, id: TransactionId) -> LedgerResult<Vec<Split>> {
        self.get_transaction_required(id).await?;
        self.storage.list_splits(id).await
    }

    fn ensure_editable(&self, transaction: &Transaction) -> LedgerResult<()> {
        if transaction.is_opening {
            warn!(transaction_id = %transaction.id, "rejected change to opening transaction");
            return Err(LedgerError::ProtectedTransaction(transaction.id));
        }
        if transaction.status.is_locked() {
            warn!(transaction_id = %transaction.id, "rejected change to reconciled transaction");
            return Err(LedgerError::ReconciledLocked(transaction.id));
        }
        Ok(())
    }

    /// Delete a transaction together with its splits
    pub async fn delete_transaction(&mut self, id: TransactionId) -> LedgerResult<()> {
        let transaction = self.get_transaction_required(id).await?;
        self.ensure_editable(&transaction)?;

        self.storage
            .apply(vec![WriteOp::DeleteTransaction(id)])
            .await?;

        info!(transaction_id = %id, "transaction deleted");
        Ok(())
    }

    /// Change the status of a transaction
    ///
    /// Reconciled is terminal: setting it again fails with
    /// `AlreadyReconciled`, and demotion fails with `ReconciledLocked`
    /// unless the configuration allows it.
    pub async fn set_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> LedgerResult<()> {
        let transaction = self.get_transaction_required(id).await?;

        if transaction.status.is_locked() {
            if status.is_locked() {
                warn!(transaction_id = %id, "transaction already reconciled");
                return Err(LedgerError::AlreadyReconciled(id));
            }
            if !self.config.allow_reconciled_demotion {
                warn!(transaction_id = %id, requested = %status, "rejected demotion of reconciled transaction");
                return Err(LedgerError::ReconciledLocked(id));
            }
        }

        if transaction.status == status {
            return Ok(());
        }

        self.storage
            .apply(vec![WriteOp::UpdateStatus { id, status }])
            .await?;

        info!(transaction_id = %id, from = %transaction.status, to = %status, "transaction status changed");
        Ok(())
    }

    /// [`set_status`](Self::set_status) for a raw status code
    pub async fn set_status_code(&mut self, id: TransactionId, code: i64) -> LedgerResult<()> {
        let status = TransactionStatus::from_code(code)?;
        self.set_status(id, status).await
    }

    /// Replace the header and the complete split list of a transaction
    ///
    /// Lines with an existing id are updated in place, lines with
    /// [`SplitId::NEW`] are inserted, and stored lines missing from the
    /// request are deleted. All writes happen in one atomic batch.
    pub async fn update_complete(
        &mut self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> LedgerResult<UpdateOutcome> {
        let transaction = self.get_transaction_required(id).await?;
        self.ensure_editable(&transaction)?;

        self.validator.validate_description(&update.description)?;
        let amounts: Vec<i64> = update.splits.iter().map(|s| s.amount).collect();
        self.validator.validate_amounts(&amounts)?;

        let mut incoming = Vec::with_capacity(update.splits.len());
        for edit in update.splits {
            let account = self
                .storage
                .get_account(edit.account_id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(edit.account_id.to_string()))?;
            let currency = match edit.currency {
                Some(code) => {
                    validate_currency_code(&code)?;
                    code
                }
                None => account
                    .currency_or(&self.config.default_currency)
                    .to_string(),
            };
            incoming.push(Split {
                id: edit.id,
                transaction_id: id,
                account_id: account.id,
                amount: edit.amount,
                currency,
                memo: clean_text(edit.memo),
            });
        }

        let existing = self.storage.list_splits(id).await?;
        let plan = ReconciliationPlan::build(&existing, &incoming)?;
        debug!(
            transaction_id = %id,
            deleted = plan.delete.len(),
            updated = plan.update.len(),
            inserted = plan.insert.len(),
            unchanged = plan.unchanged.len(),
            "split reconciliation planned"
        );

        let deleted = plan.delete.clone();
        let updated: Vec<SplitId> = plan.update.iter().map(|s| s.id).collect();

        let timestamp = if update.timestamp == 0 {
            transaction.timestamp
        } else {
            update.timestamp
        };
        let mut ops = vec![WriteOp::UpdateHeader {
            id,
            timestamp,
            description: update.description.trim().to_string(),
            status: update.status,
        }];
        ops.extend(plan.into_ops(id));

        let outcome = self.storage.apply(ops).await?;

        info!(
            transaction_id = %id,
            deleted = deleted.len(),
            updated = updated.len(),
            inserted = outcome.split_ids.len(),
            "transaction updated"
        );
        Ok(UpdateOutcome {
            deleted,
            updated,
            inserted: outcome.split_ids,
        })
    }

    /// Replace the account of one leg of a two-split transaction with an
    /// account that keeps the transaction's category
    pub async fn swap_account(
        &mut self,
        id: TransactionId,
        split_id: SplitId,
        new_account_id: AccountId,
    ) -> LedgerResult<UpdateOutcome> {
        let transaction = self.get_transaction_required(id).await?;
        self.ensure_editable(&transaction)?;

        let detail = self.transaction_detail(id).await?;
        if detail.splits.len() != 2 {
            return Err(LedgerError::Validation(format!(
                "Transaction {} has {} splits; quick edit needs exactly two",
                id,
                detail.splits.len()
            )));
        }

        let leg = detail
            .splits
            .iter()
            .find(|s| s.id == split_id)
            .ok_or(LedgerError::SplitNotFound(split_id))?;
        let current_type = leg
            .account_type
            .ok_or_else(|| LedgerError::AccountNotFound(leg.account_id.to_string()))?;
        if detail
            .splits
            .iter()
            .any(|s| s.id != split_id && s.account_id == new_account_id)
        {
            return Err(LedgerError::Validation(format!(
                "Both legs of transaction {} would post to account {}",
                id, new_account_id
            )));
        }

        let accounts = self.storage.list_accounts(None).await?;
        let candidate = accounts
            .iter()
            .find(|a| a.id == new_account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(new_account_id.to_string()))?;
        let eligible = eligible_accounts_for_role_swap(detail.category, current_type, &accounts);
        if !eligible.iter().any(|a| a.id == new_account_id) {
            return Err(LedgerError::Validation(format!(
                "{} cannot replace a {} leg of a {} transaction",
                candidate.name, current_type, detail.category
            )));
        }

        let splits = self.storage.list_splits(id).await?;
        let mut update = TransactionUpdate::from_existing(&transaction, &splits);
        for edit in update.splits.iter_mut().filter(|e| e.id == split_id) {
            edit.account_id = new_account_id;
            edit.currency = None;
        }

        self.update_complete(id, update).await
    }

    /// Set `account`'s line on the opening transaction, seeding the
    /// transaction on first use and re-balancing the equity line
    pub async fn apply_opening_balance(
        &mut self,
        account: &Account,
        equity: &Account,
        amount: i64,
    ) -> LedgerResult<TransactionId> {
        if account.id == equity.id {
            return Err(LedgerError::Validation(
                "The opening balance account cannot hold an opening balance itself".to_string(),
            ));
        }

        let memo = Some(self.config.opening_balance_memo.clone());
        let currency = account
            .currency_or(&self.config.default_currency)
            .to_string();
        let equity_currency = equity
            .currency_or(&self.config.default_currency)
            .to_string();

        let Some(opening) = self.storage.opening_transaction().await? else {
            if amount == 0 {
                return Err(LedgerError::Validation(
                    "Opening balance amount cannot be zero".to_string(),
                ));
            }
            let equity_amount = amount.checked_neg().ok_or_else(|| {
                LedgerError::Validation("Opening balance amount out of range".to_string())
            })?;

            let outcome = self
                .storage
                .apply(vec![
                    WriteOp::InsertTransaction(NewTransaction {
                        timestamp: Utc::now().timestamp(),
                        description: self.config.opening_balance_memo.clone(),
                        status: TransactionStatus::Cleared,
                        external_id: None,
                        is_opening: true,
                    }),
                    WriteOp::InsertSplit {
                        target: SplitTarget::Inserted,
                        split: NewSplit {
                            account_id: account.id,
                            amount,
                            currency,
                            memo: memo.clone(),
                        },
                    },
                    WriteOp::InsertSplit {
                        target: SplitTarget::Inserted,
                        split: NewSplit {
                            account_id: equity.id,
                            amount: equity_amount,
                            currency: equity_currency,
                            memo,
                        },
                    },
                ])
                .await?;
            let id = outcome.transaction_id.ok_or_else(|| {
                LedgerError::Storage("Storage did not assign a transaction id".to_string())
            })?;
            info!(transaction_id = %id, account = %account.name, amount, "opening transaction seeded");
            return Ok(id);
        };

        if opening.status.is_locked() {
            return Err(LedgerError::ReconciledLocked(opening.id));
        }

        let existing = self.storage.list_splits(opening.id).await?;
        let mut lines = existing.clone();
        let account_lines = lines.iter().filter(|s| s.account_id != equity.id).count();

        match lines.iter().position(|s| s.account_id == account.id) {
            Some(index) if amount == 0 && account_lines > 1 => {
                lines.remove(index);
            }
            Some(index) => {
                lines[index].amount = amount;
                lines[index].currency = currency;
            }
            None if amount == 0 => return Ok(opening.id),
            None => lines.push(Split {
                id: SplitId::NEW,
                transaction_id: opening.id,
                account_id: account.id,
                amount,
                currency,
                memo: memo.clone(),
            }),
        }

        let others: Vec<i64> = lines
            .iter()
            .filter(|s| s.account_id != equity.id)
            .map(|s| s.amount)
            .collect();
        let equity_amount = checked_total(&others)?
            .checked_neg()
            .ok_or_else(|| LedgerError::Validation("Opening balances out of range".to_string()))?;
        match lines.iter_mut().find(|s| s.account_id == equity.id) {
            Some(line) => line.amount = equity_amount,
            None => lines.push(Split {
                id: SplitId::NEW,
                transaction_id: opening.id,
                account_id: equity.id,
                amount: equity_amount,
                currency: equity_currency,
                memo,
            }),
        }

        let amounts: Vec<i64> = lines.iter().map(|s| s.amount).collect();
        DefaultTransactionValidator.validate_amounts(&amounts)?;

        let plan = ReconciliationPlan::build(&existing, &lines)?;
        if !plan.is_noop() {
            self.storage.apply(plan.into_ops(opening.id)).await?;
        }

        info!(transaction_id = %opening.id, account = %account.name, amount, "opening balance recorded");
        Ok(opening.id)
    }

    fn resolve_splits(
        splits: Vec<Split>,
        accounts: &HashMap<AccountId, Account>,
    ) -> Vec<SplitDetail> {
        splits
            .into_iter()
            .map(|split| {
                let account = accounts.get(&split.account_id);
                SplitDetail {
                    id: split.id,
                    account_id: split.account_id,
                    account_name: account
                        .map(|a| a.name.clone())
                        .unwrap_or_else(|| format!("<missing account {}>", split.account_id)),
                    account_type: account.map(|a| a.account_type),
                    amount: split.amount,
                    currency: split.currency,
                    memo: split.memo,
                }
            })
            .collect()
    }

    async fn account_map(&self) -> LedgerResult<HashMap<AccountId, Account>> {
        Ok(self
            .storage
            .list_accounts(None)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect())
    }

    /// A transaction with resolved splits and its classification
    pub async fn transaction_detail(&self, id: TransactionId) -> LedgerResult<TransactionDetail> {
        let transaction = self.get_transaction_required(id).await?;
        let accounts = self.account_map().await?;
        let splits = Self::resolve_splits(self.storage.list_splits(id).await?, &accounts);
        let classification = self.classifier.summarize(&splits);

        Ok(TransactionDetail {
            transaction,
            splits,
            category: classification.category,
            display_account: classification.display_account,
            display_amount: classification.display_amount,
        })
    }

    /// One summary row per transaction, newest first
    pub async fn list_transaction_summaries(&self) -> LedgerResult<Vec<TransactionSummary>> {
        let accounts = self.account_map().await?;
        let mut transactions = self.storage.list_transactions().await?;
        transactions.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));

        let mut summaries = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let splits =
                Self::resolve_splits(self.storage.list_splits(transaction.id).await?, &accounts);
            let classification = self.classifier.summarize(&splits);
            summaries.push(TransactionSummary {
                id: transaction.id,
                timestamp: transaction.timestamp,
                description: transaction.description,
                status: transaction.status,
                category: classification.category,
                display_account: classification.display_account,
                display_amount: classification.display_amount,
            });
        }

        Ok(summaries)
    }

    /// Transactions touching an account with a running balance, oldest first
    pub async fn account_register(&self, account_id: AccountId) -> LedgerResult<Vec<RegisterEntry>> {
        if self.storage.get_account(account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        let mut rows = Vec::new();
        for split in self.storage.list_account_splits(account_id).await? {
            let transaction = self.get_transaction_required(split.transaction_id).await?;
            rows.push((transaction, split));
        }
        rows.sort_by_key(|(t, s)| (t.timestamp, t.id, s.id));

        let mut running_balance: i64 = 0;
        let mut register = Vec::with_capacity(rows.len());
        for (transaction, split) in rows {
            running_balance = running_balance
                .checked_add(split.amount)
                .ok_or_else(|| LedgerError::Storage("Balance overflow".to_string()))?;
            register.push(RegisterEntry {
                transaction_id: transaction.id,
                timestamp: transaction.timestamp,
                description: transaction.description,
                status: transaction.status,
                split_id: split.id,
                amount: split.amount,
                running_balance,
            });
        }

        Ok(register)
    }
}

/// Transaction builder for assembling a [`TransactionInput`]
#[derive(Debug)]
pub struct TransactionBuilder {
    input: TransactionInput,
}

impl TransactionBuilder {
    /// Create a new transaction builder
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            input: TransactionInput {
                description: description.into(),
                ..TransactionInput::default()
            },
        }
    }

    /// Unix timestamp; left at zero the ledger uses the current time
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.input.timestamp = timestamp;
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.input.status = status;
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.input.external_id = Some(external_id.into());
        self
    }

    /// Add a split by full account name
    pub fn split(mut self, account: impl Into<String>, amount: i64) -> Self {
        self.input.splits.push(SplitInput::new(account, amount));
        self
    }

    pub fn split_with_memo(
        mut self,
        account: impl Into<String>,
        amount: i64,
        memo: impl Into<String>,
    ) -> Self {
        self.input
            .splits
            .push(SplitInput::new(account, amount).with_memo(memo));
        self
    }

    /// Build the input, checking the double-entry rules up front
    pub fn build(self) -> LedgerResult<TransactionInput> {
        let amounts: Vec<i64> = self.input.splits.iter().map(|s| s.amount).collect();
        DefaultTransactionValidator.validate_amounts(&amounts)?;
        Ok(self.input)
    }
}

/// Common transaction patterns
pub mod patterns {
    use super::*;

    /// Money spent from an asset or liability account
    pub fn expense(
        description: &str,
        expense_account: &str,
        paid_from: &str,
        amount: i64,
    ) -> LedgerResult<TransactionInput> {
        TransactionBuilder::new(description)
            .split(paid_from, -amount)
            .split(expense_account, amount)
            .build()
    }

    /// Money earned into an asset account
    pub fn income(
        description: &str,
        revenue_account: &str,
        received_into: &str,
        amount: i64,
    ) -> LedgerResult<TransactionInput> {
        TransactionBuilder::new(description)
            .split(received_into, amount)
            .split(revenue_account, -amount)
            .build()
    }

    /// Money moved between two asset/liability accounts
    pub fn transfer(
        description: &str,
        from: &str,
        to: &str,
        amount: i64,
    ) -> LedgerResult<TransactionInput> {
        TransactionBuilder::new(description)
            .split(to, amount)
            .split(from, -amount)
            .build()
    }
}
