//! Integration tests for bookkeeping-core

use bookkeeping_core::{
    patterns,
    utils::{EnhancedAccountValidator, EnhancedTransactionValidator, MemoryStorage},
    Account, AccountId, AccountType, Category, Classifier, ErrorKind, Ledger, LedgerConfig,
    LedgerError, ReconciliationPlan, Split, SplitDetail, SplitEdit, SplitId, TransactionBuilder,
    TransactionId, TransactionStatus, TransactionUpdate,
};
use proptest::prelude::*;

struct Chart {
    cash: Account,
    bank: Account,
    food: Account,
    salary: Account,
    card: Account,
}

async fn setup() -> (MemoryStorage, Ledger<MemoryStorage>, Chart) {
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::new(storage.clone());

    let chart = Chart {
        cash: ledger.create_account_path("Assets:Cash").await.unwrap(),
        bank: ledger.create_account_path("Assets:Bank").await.unwrap(),
        food: ledger.create_account_path("Expenses:Food").await.unwrap(),
        salary: ledger.create_account_path("Revenue:Salary").await.unwrap(),
        card: ledger.create_account_path("Liabilities:Card").await.unwrap(),
    };

    (storage, ledger, chart)
}

#[tokio::test]
async fn test_expense_scenario() {
    let (_, mut ledger, chart) = setup().await;

    let lunch = TransactionBuilder::new("Lunch")
        .timestamp(1_700_000_000)
        .split("Assets:Cash", -1500)
        .split("Expenses:Food", 1500)
        .build()
        .unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();

    let detail = ledger.transaction_detail(id).await.unwrap();
    assert_eq!(detail.category, Category::Expense);
    assert_eq!(detail.display_account.as_deref(), Some("Expenses:Food"));
    assert_eq!(detail.display_amount.amount, 1500);
    assert_eq!(detail.display_amount.to_string(), "15.00 USD");

    assert_eq!(ledger.account_balance(chart.cash.id).await.unwrap(), -1500);
    assert_eq!(ledger.account_balance(chart.food.id).await.unwrap(), 1500);
}

#[tokio::test]
async fn test_income_scenario() {
    let (_, mut ledger, _) = setup().await;

    let pay = patterns::income("Paycheck", "Revenue:Salary", "Assets:Bank", 1500).unwrap();
    let id = ledger.create_transaction(pay).await.unwrap();

    let detail = ledger.transaction_detail(id).await.unwrap();
    assert_eq!(detail.category, Category::Income);
    assert_eq!(detail.display_account.as_deref(), Some("Revenue:Salary"));
}

#[tokio::test]
async fn test_transfer_scenario() {
    let (_, mut ledger, _) = setup().await;

    let transfer = patterns::transfer("ATM deposit", "Assets:Cash", "Assets:Bank", 1000).unwrap();
    let id = ledger.create_transaction(transfer).await.unwrap();

    let detail = ledger.transaction_detail(id).await.unwrap();
    assert_eq!(detail.category, Category::Transfer);
    assert_eq!(detail.display_account.as_deref(), Some("Assets:Bank"));
    assert_eq!(detail.display_amount.amount, 1000);
}

#[tokio::test]
async fn test_update_complete_keeps_split_ids() {
    let (storage, mut ledger, chart) = setup().await;

    let transfer = patterns::transfer("Savings", "Assets:Cash", "Assets:Bank", 1000).unwrap();
    let id = ledger.create_transaction(transfer).await.unwrap();
    let before = ledger.list_splits(id).await.unwrap();
    let transaction = ledger.get_transaction(id).await.unwrap().unwrap();

    let mut update = TransactionUpdate::from_existing(&transaction, &before);
    for edit in update.splits.iter_mut() {
        edit.amount *= 2;
    }
    let outcome = ledger.update_complete(id, update).await.unwrap();
    assert!(outcome.inserted.is_empty());
    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.updated.len(), 2);

    let after = ledger.list_splits(id).await.unwrap();
    let ids_before: Vec<SplitId> = before.iter().map(|s| s.id).collect();
    let ids_after: Vec<SplitId> = after.iter().map(|s| s.id).collect();
    assert_eq!(ids_before, ids_after);

    let bank_line = after.iter().find(|s| s.account_id == chart.bank.id).unwrap();
    let cash_line = after.iter().find(|s| s.account_id == chart.cash.id).unwrap();
    assert_eq!(bank_line.amount, 2000);
    assert_eq!(cash_line.amount, -2000);
    assert_eq!(storage.row_counts().unwrap(), (1, 2));
}

#[tokio::test]
async fn test_opening_transaction_is_protected() {
    let (_, mut ledger, chart) = setup().await;

    let id = ledger
        .record_opening_balance("Assets:Bank", 50000)
        .await
        .unwrap();

    assert_eq!(
        ledger.delete_transaction(id).await,
        Err(LedgerError::ProtectedTransaction(id))
    );

    // Status changes are allowed, deletion stays refused
    ledger
        .set_status(id, TransactionStatus::Reconciled)
        .await
        .unwrap();
    let err = ledger.delete_transaction(id).await.unwrap_err();
    assert_eq!(err, LedgerError::ProtectedTransaction(id));
    assert_eq!(err.kind(), ErrorKind::Locked);

    let splits = ledger.list_splits(id).await.unwrap();
    let update = TransactionUpdate::from_existing(
        &ledger.get_transaction(id).await.unwrap().unwrap(),
        &splits,
    );
    assert_eq!(
        ledger.update_complete(id, update).await,
        Err(LedgerError::ProtectedTransaction(id))
    );
    assert_eq!(ledger.account_balance(chart.bank.id).await.unwrap(), 50000);
}

#[tokio::test]
async fn test_unbalanced_transaction_persists_nothing() {
    let (storage, mut ledger, _) = setup().await;

    let input = bookkeeping_core::TransactionInput {
        description: "Broken".to_string(),
        splits: vec![
            bookkeeping_core::SplitInput::new("Assets:Cash", -1500),
            bookkeeping_core::SplitInput::new("Expenses:Food", 1400),
        ],
        ..Default::default()
    };
    let err = ledger.create_transaction(input).await.unwrap_err();
    assert_eq!(err, LedgerError::Unbalanced { total: -100 });
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(storage.row_counts().unwrap(), (0, 0));

    let single = bookkeeping_core::TransactionInput {
        description: "Lonely".to_string(),
        splits: vec![bookkeeping_core::SplitInput::new("Assets:Cash", 0)],
        ..Default::default()
    };
    assert_eq!(
        ledger.create_transaction(single).await,
        Err(LedgerError::TooFewSplits(1))
    );
    assert_eq!(storage.row_counts().unwrap(), (0, 0));
}

#[tokio::test]
async fn test_reconciled_transaction_rejects_full_edit() {
    let (storage, mut ledger, chart) = setup().await;

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    ledger
        .set_status(id, TransactionStatus::Reconciled)
        .await
        .unwrap();

    let before = ledger.list_splits(id).await.unwrap();
    let transaction = ledger.get_transaction(id).await.unwrap().unwrap();
    let mut update = TransactionUpdate::from_existing(&transaction, &before);
    update.description = "Dinner".to_string();
    update.splits[0].amount = -3000;
    update.splits[1].amount = 3000;

    assert_eq!(
        ledger.update_complete(id, update).await,
        Err(LedgerError::ReconciledLocked(id))
    );
    assert_eq!(
        ledger.set_status(id, TransactionStatus::Pending).await,
        Err(LedgerError::ReconciledLocked(id))
    );
    assert_eq!(
        ledger.set_status(id, TransactionStatus::Reconciled).await,
        Err(LedgerError::AlreadyReconciled(id))
    );
    assert_eq!(
        ledger.delete_transaction(id).await,
        Err(LedgerError::ReconciledLocked(id))
    );

    assert_eq!(ledger.list_splits(id).await.unwrap(), before);
    assert_eq!(ledger.get_transaction(id).await.unwrap().unwrap(), transaction);
    assert_eq!(ledger.account_balance(chart.food.id).await.unwrap(), 1500);
    assert_eq!(storage.row_counts().unwrap(), (1, 2));
}

#[tokio::test]
async fn test_update_complete_is_idempotent() {
    let (_, mut ledger, _) = setup().await;

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    let splits = ledger.list_splits(id).await.unwrap();
    let transaction = ledger.get_transaction(id).await.unwrap().unwrap();

    for _ in 0..2 {
        let update = TransactionUpdate::from_existing(&transaction, &splits);
        let outcome = ledger.update_complete(id, update).await.unwrap();
        assert!(outcome.deleted.is_empty());
        assert!(outcome.updated.is_empty());
        assert!(outcome.inserted.is_empty());
    }

    assert_eq!(ledger.list_splits(id).await.unwrap(), splits);
    assert_eq!(ledger.get_transaction(id).await.unwrap().unwrap(), transaction);
}

#[tokio::test]
async fn test_update_complete_adds_and_removes_lines() {
    let (_, mut ledger, chart) = setup().await;

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    let splits = ledger.list_splits(id).await.unwrap();
    let transaction = ledger.get_transaction(id).await.unwrap().unwrap();
    let food_line = splits.iter().find(|s| s.account_id == chart.food.id).unwrap();

    // Pay half by card instead of all cash
    let update = TransactionUpdate {
        timestamp: 0,
        description: "Lunch, split payment".to_string(),
        status: TransactionStatus::Cleared,
        splits: vec![
            SplitEdit::from(food_line),
            SplitEdit::added(chart.cash.id, -750),
            SplitEdit::added(chart.card.id, -750).with_memo("visa"),
        ],
    };
    let outcome = ledger.update_complete(id, update).await.unwrap();
    assert_eq!(outcome.deleted.len(), 1);
    assert_eq!(outcome.inserted.len(), 2);

    let after = ledger.get_transaction(id).await.unwrap().unwrap();
    assert_eq!(after.timestamp, transaction.timestamp);
    assert_eq!(after.status, TransactionStatus::Cleared);
    assert_eq!(ledger.list_splits(id).await.unwrap().len(), 3);
    assert_eq!(ledger.account_balance(chart.card.id).await.unwrap(), -750);
    assert_eq!(ledger.account_balance(chart.cash.id).await.unwrap(), -750);

    let foreign = TransactionUpdate {
        splits: vec![
            SplitEdit {
                id: SplitId(999),
                account_id: chart.food.id,
                amount: 1500,
                currency: None,
                memo: None,
            },
            SplitEdit::added(chart.cash.id, -1500),
        ],
        ..TransactionUpdate::from_existing(&after, &[])
    };
    assert_eq!(
        ledger.update_complete(id, foreign).await,
        Err(LedgerError::SplitNotFound(SplitId(999)))
    );
    assert_eq!(ledger.list_splits(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_storage_failure_during_update_rolls_back() {
    let (storage, mut ledger, _) = setup().await;

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    let splits = ledger.list_splits(id).await.unwrap();
    let transaction = ledger.get_transaction(id).await.unwrap().unwrap();

    let mut update = TransactionUpdate::from_existing(&transaction, &splits);
    update.description = "Changed".to_string();
    update.splits[0].amount *= 3;
    update.splits[1].amount *= 3;

    storage.fail_batch_at(2);
    let err = ledger.update_complete(id, update).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(ledger.list_splits(id).await.unwrap(), splits);
    assert_eq!(ledger.get_transaction(id).await.unwrap().unwrap(), transaction);
}

#[tokio::test]
async fn test_quick_edit_swaps_account() {
    let (_, mut ledger, chart) = setup().await;

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    let paid_from = ledger
        .list_splits(id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.account_id == chart.cash.id)
        .unwrap();

    ledger
        .swap_account(id, paid_from.id, chart.card.id)
        .await
        .unwrap();
    assert_eq!(ledger.account_balance(chart.card.id).await.unwrap(), -1500);
    assert_eq!(ledger.account_balance(chart.cash.id).await.unwrap(), 0);
    assert_eq!(
        ledger.transaction_detail(id).await.unwrap().category,
        Category::Expense
    );

    // Revenue cannot take the funding role of an expense
    let err = ledger
        .swap_account(id, paid_from.id, chart.salary.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_summaries_and_balances() {
    let (_, mut ledger, chart) = setup().await;

    ledger
        .record_opening_balance("Assets:Bank", 100000)
        .await
        .unwrap();
    for (timestamp, amount) in [(1_700_000_100, 1200), (1_700_000_200, 800)] {
        let input = TransactionBuilder::new("Groceries")
            .timestamp(timestamp)
            .split("Assets:Bank", -amount)
            .split("Expenses:Food", amount)
            .build()
            .unwrap();
        ledger.create_transaction(input).await.unwrap();
    }

    let summaries = ledger.list_transaction_summaries().await.unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].category, Category::Opening);
    assert_eq!(summaries[1].display_amount.amount, 800);
    assert_eq!(summaries[2].display_amount.amount, 1200);

    let register = ledger.account_register(chart.bank.id).await.unwrap();
    assert_eq!(register.len(), 3);
    assert_eq!(register.last().unwrap().running_balance, 98000);

    let balances = ledger.balances(false).await.unwrap();
    let total: i64 = balances.iter().map(|b| b.balance.amount).sum();
    assert_eq!(total, 0);

    let report = ledger.validate_integrity().await.unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
    assert_eq!(report.transaction_count, 3);
}

#[tokio::test]
async fn test_account_lifecycle() {
    let (_, mut ledger, chart) = setup().await;

    let groceries = ledger
        .create_subaccount(chart.food.id, "Groceries", None)
        .await
        .unwrap();
    assert_eq!(groceries.name, "Expenses:Food:Groceries");
    assert_eq!(groceries.account_type, AccountType::Expense);

    let duplicate = ledger
        .create_account(AccountType::Asset, "Cash", None)
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Constraint);
    assert!(matches!(
        ledger.create_account(AccountType::Asset, "CASH", None).await,
        Err(LedgerError::DuplicateAccount(_))
    ));

    let lunch = patterns::expense("Lunch", &groceries.name, "Assets:Cash", 900).unwrap();
    ledger.create_transaction(lunch).await.unwrap();
    assert_eq!(
        ledger.subtree_balance(chart.food.id).await.unwrap().amount,
        900
    );

    let in_use = ledger.delete_account(groceries.id).await.unwrap_err();
    assert!(matches!(in_use, LedgerError::AccountInUse(_)));

    ledger.set_account_hidden(chart.salary.id, true).await.unwrap();
    let visible = ledger.balances(false).await.unwrap();
    assert!(visible.iter().all(|b| b.account.id != chart.salary.id));

    let path = ledger.account_path(groceries.id).await.unwrap();
    let names: Vec<&str> = path.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Expenses:Food", "Expenses:Food:Groceries"]);
}

#[tokio::test]
async fn test_external_id_import_deduplicated() {
    let (_, mut ledger, _) = setup().await;

    let import = || {
        TransactionBuilder::new("Coffee")
            .external_id("bank-2024-0001")
            .split("Assets:Bank", -450)
            .split("Expenses:Food", 450)
            .build()
            .unwrap()
    };
    let id = ledger.create_transaction(import()).await.unwrap();
    assert_eq!(
        ledger.create_transaction(import()).await,
        Err(LedgerError::DuplicateExternalId("bank-2024-0001".to_string()))
    );
    assert_eq!(
        ledger
            .find_by_external_id("bank-2024-0001")
            .await
            .unwrap()
            .map(|t| t.id),
        Some(id)
    );
}

#[tokio::test]
async fn test_enhanced_validators() {
    let mut ledger = Ledger::with_validators(
        MemoryStorage::new(),
        LedgerConfig::default(),
        Box::new(EnhancedAccountValidator),
        Box::new(EnhancedTransactionValidator),
    )
    .unwrap();

    assert!(ledger
        .create_account(AccountType::Asset, "Petty/Cash", None)
        .await
        .is_err());
    ledger.create_account_path("Assets:Cash").await.unwrap();
    ledger.create_account_path("Expenses:Food").await.unwrap();

    let blank = TransactionBuilder::new("   ")
        .split("Assets:Cash", -100)
        .split("Expenses:Food", 100)
        .build()
        .unwrap();
    assert!(matches!(
        ledger.create_transaction(blank).await,
        Err(LedgerError::Validation(_))
    ));

    let zero_line = TransactionBuilder::new("Lunch")
        .split("Assets:Cash", -100)
        .split("Expenses:Food", 100)
        .split("Expenses:Food", 0)
        .build()
        .unwrap();
    assert!(ledger.create_transaction(zero_line).await.is_err());
}

#[tokio::test]
async fn test_config_from_json() {
    let config = LedgerConfig::from_json_str(
        r#"{"default_currency": "EUR", "allow_reconciled_demotion": true}"#,
    )
    .unwrap();
    let mut ledger = Ledger::with_config(MemoryStorage::new(), config).unwrap();
    let cash = ledger.create_account_path("Assets:Cash").await.unwrap();
    ledger.create_account_path("Expenses:Food").await.unwrap();

    let lunch = patterns::expense("Lunch", "Expenses:Food", "Assets:Cash", 1500).unwrap();
    let id = ledger.create_transaction(lunch).await.unwrap();
    assert_eq!(
        ledger.transaction_detail(id).await.unwrap().display_amount.currency,
        "EUR"
    );

    ledger.set_status_code(id, 2).await.unwrap();
    ledger.set_status_code(id, 1).await.unwrap();
    assert_eq!(
        ledger.get_transaction(id).await.unwrap().unwrap().status,
        TransactionStatus::Cleared
    );
    assert_eq!(
        ledger.set_status_code(id, 7).await,
        Err(LedgerError::InvalidStatus(7))
    );
    assert_eq!(ledger.account_balance(cash.id).await.unwrap(), -1500);
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn detail(id: i64, name: &str, account_type: AccountType, amount: i64) -> SplitDetail {
    SplitDetail {
        id: SplitId(id),
        account_id: AccountId(id),
        account_name: name.to_string(),
        account_type: Some(account_type),
        amount,
        currency: "USD".to_string(),
        memo: None,
    }
}

fn account_type() -> impl Strategy<Value = AccountType> {
    prop::sample::select(AccountType::ALL.to_vec())
}

proptest! {
    #[test]
    fn classification_ignores_split_order(
        first in account_type(),
        second in account_type(),
        third in account_type(),
        a in 1i64..1_000_000,
        b in 1i64..1_000_000,
    ) {
        let classifier = Classifier::default();
        let splits = vec![
            detail(1, "One", first, a),
            detail(2, "Two", second, b),
            detail(3, "Three", third, -(a + b)),
        ];
        let mut reversed = splits.clone();
        reversed.reverse();
        let mut rotated = splits.clone();
        rotated.rotate_left(1);

        let category = classifier.classify(&splits);
        prop_assert_eq!(category, classifier.classify(&reversed));
        prop_assert_eq!(category, classifier.classify(&rotated));
    }

    #[test]
    fn unbalanced_transactions_are_rejected(
        amounts in prop::collection::vec(-1_000_000i64..1_000_000, 2..6),
    ) {
        let total: i128 = amounts.iter().map(|a| i128::from(*a)).sum();
        prop_assume!(total != 0);

        block_on(async {
            let (storage, mut ledger, _) = setup().await;
            let mut builder = bookkeeping_core::TransactionInput {
                description: "Generated".to_string(),
                ..Default::default()
            };
            for (i, amount) in amounts.iter().enumerate() {
                let account = if i % 2 == 0 { "Assets:Cash" } else { "Expenses:Food" };
                builder.splits.push(bookkeeping_core::SplitInput::new(account, *amount));
            }

            assert_eq!(
                ledger.create_transaction(builder).await,
                Err(LedgerError::Unbalanced { total })
            );
            assert_eq!(storage.row_counts().unwrap(), (0, 0));
        });
    }

    #[test]
    fn accepted_transactions_sum_to_zero(
        amounts in prop::collection::vec(-1_000_000i64..1_000_000, 1..6),
    ) {
        let balancing = -amounts.iter().sum::<i64>();

        block_on(async {
            let (_, mut ledger, chart) = setup().await;
            let mut builder = TransactionBuilder::new("Generated");
            for (i, amount) in amounts.iter().enumerate() {
                let account = if i % 2 == 0 { "Expenses:Food" } else { "Assets:Bank" };
                builder = builder.split(account, *amount);
            }
            let input = builder.split("Assets:Cash", balancing).build().unwrap();
            let id = ledger.create_transaction(input).await.unwrap();

            let splits = ledger.list_splits(id).await.unwrap();
            assert_eq!(splits.len(), amounts.len() + 1);
            assert_eq!(splits.iter().map(|s| s.amount).sum::<i64>(), 0);
            assert_eq!(ledger.account_balance(chart.cash.id).await.unwrap(), balancing);
        });
    }

    #[test]
    fn reapplying_stored_splits_plans_nothing(
        amounts in prop::collection::vec(-1_000_000i64..1_000_000, 1..8),
    ) {
        let existing: Vec<Split> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Split {
                id: SplitId(i as i64 + 1),
                transaction_id: TransactionId(1),
                account_id: AccountId(i as i64 % 3 + 1),
                amount: *amount,
                currency: "USD".to_string(),
                memo: None,
            })
            .collect();

        let plan = ReconciliationPlan::build(&existing, &existing).unwrap();
        prop_assert!(plan.is_noop());
        prop_assert_eq!(plan.unchanged.len(), existing.len());
        prop_assert!(plan.into_ops(TransactionId(1)).is_empty());
    }
}
