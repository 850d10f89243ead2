//! Transaction classification
//!
//! Categories are never stored. They are derived from the types of the
//! accounts a transaction touches and, when Revenue and Expense legs meet
//! without any Asset/Liability leg, from the magnitude of those legs. Every decision works on totals
//! over the split set, so the order of the splits does not matter.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::DEFAULT_OPENING_MEMO;
use crate::types::*;

/// Semantic category of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Seeds starting balances against equity
    Opening,
    /// Money moved into an asset/liability from equity
    Deposit,
    /// Money moved out of an asset/liability into equity
    Withdrawal,
    Expense,
    Income,
    /// Between asset/liability accounts only
    Transfer,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Opening => "Opening Balance",
            Category::Deposit => "Deposit",
            Category::Withdrawal => "Withdrawal",
            Category::Expense => "Expense",
            Category::Income => "Income",
            Category::Transfer => "Transfer",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Totals per account role over a split set
#[derive(Debug, Default)]
struct Legs {
    asset_liability: usize,
    asset_liability_sum: i128,
    equity: usize,
    expense: usize,
    expense_abs: i128,
    revenue: usize,
    revenue_abs: i128,
}

impl Legs {
    fn tally(splits: &[SplitDetail]) -> Self {
        let mut legs = Legs::default();
        for split in splits {
            let amount = i128::from(split.amount);
            match split.account_type {
                Some(AccountType::Asset | AccountType::Liability) => {
                    legs.asset_liability += 1;
                    legs.asset_liability_sum += amount;
                }
                Some(AccountType::Equity) => legs.equity += 1,
                Some(AccountType::Expense) => {
                    legs.expense += 1;
                    legs.expense_abs += amount.abs();
                }
                Some(AccountType::Revenue) => {
                    legs.revenue += 1;
                    legs.revenue_abs += amount.abs();
                }
                None => {}
            }
        }
        legs
    }
}

/// Derives categories using the configured opening-balance memo marker
#[derive(Debug, Clone)]
pub struct Classifier {
    opening_memo: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_OPENING_MEMO)
    }
}

impl Classifier {
    pub fn new(opening_memo: impl Into<String>) -> Self {
        Self {
            opening_memo: opening_memo.into(),
        }
    }

    /// Category of a split set, checked in a fixed order: Opening,
    /// Deposit/Withdrawal, Expense, Income, Transfer, Other
    pub fn classify(&self, splits: &[SplitDetail]) -> Category {
        if splits
            .iter()
            .any(|s| s.memo.as_deref() == Some(self.opening_memo.as_str()))
        {
            return Category::Opening;
        }

        let legs = Legs::tally(splits);

        if legs.equity > 0 && legs.asset_liability > 0 {
            return if legs.asset_liability_sum > 0 {
                Category::Deposit
            } else {
                Category::Withdrawal
            };
        }

        if legs.expense > 0 && legs.asset_liability > 0 {
            return Category::Expense;
        }

        if legs.revenue > 0 && legs.asset_liability > 0 {
            return Category::Income;
        }

        // revenue against expense only: the larger side wins, ties go to Income
        if legs.expense > 0 && legs.revenue > 0 {
            return if legs.expense_abs > legs.revenue_abs {
                Category::Expense
            } else {
                Category::Income
            };
        }

        if legs.asset_liability >= 2 {
            return Category::Transfer;
        }

        Category::Other
    }

    /// Category plus the display account and amount
    pub fn summarize(&self, splits: &[SplitDetail]) -> Classification {
        let category = self.classify(splits);
        let display_account = display_account(splits, category).map(str::to_string);
        let display_amount = display_amount(splits);
        debug!(
            %category,
            display_account = display_account.as_deref().unwrap_or(""),
            splits = splits.len(),
            "classified transaction"
        );
        Classification {
            category,
            display_account,
            display_amount,
        }
    }
}

/// Output of [`Classifier::summarize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub display_account: Option<String>,
    pub display_amount: Money,
}

fn is_type(split: &SplitDetail, account_type: AccountType) -> bool {
    split.account_type == Some(account_type)
}

fn is_asset_or_liability(split: &SplitDetail) -> bool {
    split
        .account_type
        .is_some_and(|t| t.is_asset_or_liability())
}

/// First split with the largest key among those matching `filter`
fn pick_max<'a>(
    splits: &'a [SplitDetail],
    filter: impl Fn(&SplitDetail) -> bool,
    key: impl Fn(&SplitDetail) -> i128,
) -> Option<&'a SplitDetail> {
    splits
        .iter()
        .filter(|&s| filter(s))
        .fold(None, |best: Option<&SplitDetail>, s| match best {
            Some(b) if key(b) >= key(s) => Some(b),
            _ => Some(s),
        })
}

fn magnitude(split: &SplitDetail) -> i128 {
    i128::from(split.amount).abs()
}

/// The account that best represents the transaction in list views
///
/// Falls back to the first split's account; `None` only for an empty set.
pub fn display_account(splits: &[SplitDetail], category: Category) -> Option<&str> {
    let chosen = match category {
        Category::Expense => pick_max(splits, |s| is_type(s, AccountType::Expense), magnitude),
        Category::Income => pick_max(splits, |s| is_type(s, AccountType::Revenue), magnitude),
        Category::Transfer => pick_max(
            splits,
            |s| is_asset_or_liability(s) && s.amount > 0,
            |s| i128::from(s.amount),
        ),
        Category::Deposit | Category::Withdrawal => {
            pick_max(splits, is_asset_or_liability, magnitude)
        }
        Category::Opening => splits
            .iter()
            .find(|s| s.account_type.is_some() && !is_type(s, AccountType::Equity)),
        Category::Other => splits.iter().find(|s| s.amount > 0),
    };

    chosen
        .or_else(|| splits.first())
        .map(|s| s.account_name.as_str())
}

/// Largest positive split amount with its currency
pub fn display_amount(splits: &[SplitDetail]) -> Money {
    match pick_max(splits, |s| s.amount > 0, |s| i128::from(s.amount)) {
        Some(split) => Money::new(split.amount, split.currency.clone()),
        None => splits
            .first()
            .map(|s| Money::zero(s.currency.clone()))
            .unwrap_or_default(),
    }
}

/// Accounts that may replace one leg of a two-split transaction without
/// changing what kind of transaction it is
pub fn eligible_accounts_for_role_swap(
    category: Category,
    current_type: AccountType,
    accounts: &[Account],
) -> Vec<&Account> {
    let allowed = |t: AccountType| -> bool {
        match category {
            Category::Expense if current_type == AccountType::Expense => {
                t == AccountType::Expense
            }
            Category::Income if current_type == AccountType::Revenue => {
                t == AccountType::Revenue
            }
            Category::Deposit | Category::Withdrawal if current_type == AccountType::Equity => {
                t == AccountType::Equity
            }
            Category::Expense
            | Category::Income
            | Category::Transfer
            | Category::Deposit
            | Category::Withdrawal => t.is_asset_or_liability(),
            Category::Opening | Category::Other => t == current_type,
        }
    };

    accounts
        .iter()
        .filter(|a| !a.hidden && allowed(a.account_type))
        .collect()
}
