//! Split reconciliation for full transaction edits
//!
//! An edit hands over the complete new split list. Lines keep their id when
//! they already exist and carry [`SplitId::NEW`] otherwise. The plan is a
//! three-way difference keyed by split id: stored ids missing from the edit
//! are deleted, known ids are updated in place, new lines are inserted.
//! Ids are never renumbered.

use std::collections::{BTreeSet, HashMap};

use crate::traits::*;
use crate::types::*;

/// Writes needed to turn the stored split set into the edited one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub delete: Vec<SplitId>,
    pub update: Vec<Split>,
    /// Existing lines the edit leaves exactly as they are
    pub unchanged: Vec<SplitId>,
    pub insert: Vec<NewSplit>,
}

impl ReconciliationPlan {
    /// Compare the stored splits with the edited ones
    ///
    /// Every non-new id in `incoming` must belong to `existing`.
    pub fn build(existing: &[Split], incoming: &[Split]) -> LedgerResult<Self> {
        let stored: HashMap<SplitId, &Split> = existing.iter().map(|s| (s.id, s)).collect();
        let mut kept = BTreeSet::new();
        let mut plan = ReconciliationPlan::default();

        for split in incoming {
            if split.id.is_new() {
                plan.insert.push(NewSplit {
                    account_id: split.account_id,
                    amount: split.amount,
                    currency: split.currency.clone(),
                    memo: split.memo.clone(),
                });
                continue;
            }

            let current = stored
                .get(&split.id)
                .ok_or(LedgerError::SplitNotFound(split.id))?;
            if !kept.insert(split.id) {
                return Err(LedgerError::Validation(format!(
                    "Split {} appears more than once",
                    split.id
                )));
            }

            let edited = Split {
                transaction_id: current.transaction_id,
                ..split.clone()
            };
            if **current == edited {
                plan.unchanged.push(split.id);
            } else {
                plan.update.push(edited);
            }
        }

        plan.delete = existing
            .iter()
            .map(|s| s.id)
            .filter(|id| !kept.contains(id))
            .collect();

        Ok(plan)
    }

    pub fn is_noop(&self) -> bool {
        self.delete.is_empty() && self.update.is_empty() && self.insert.is_empty()
    }

    /// Storage writes in apply order: deletes, updates, inserts
    pub fn into_ops(self, transaction_id: TransactionId) -> Vec<WriteOp> {
        let mut ops = Vec::with_capacity(self.delete.len() + self.update.len() + self.insert.len());
        ops.extend(self.delete.into_iter().map(WriteOp::DeleteSplit));
        ops.extend(self.update.into_iter().map(WriteOp::UpdateSplit));
        ops.extend(self.insert.into_iter().map(|split| WriteOp::InsertSplit {
            target: SplitTarget::Existing(transaction_id),
            split,
        }));
        ops
    }
}
