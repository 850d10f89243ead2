//! Basic ledger usage example

use bookkeeping_core::utils::MemoryStorage;
use bookkeeping_core::{
    patterns, AccountType, Ledger, LedgerConfig, TransactionBuilder, TransactionStatus,
    TransactionUpdate,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🧾 Bookkeeping Core - Basic Ledger Example\n");

    // Create a new ledger with in-memory storage
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::with_config(storage, LedgerConfig::default())?;

    // 1. Set up a personal chart of accounts
    println!("📊 Setting up Chart of Accounts...");
    let checking = ledger.create_account_path("Assets:Bank:Checking").await?;
    let cash = ledger.create_account(AccountType::Asset, "Cash", None).await?;
    let card = ledger
        .create_account(AccountType::Liability, "Credit Card", None)
        .await?;
    let groceries = ledger.create_account_path("Expenses:Food:Groceries").await?;
    let salary = ledger
        .create_account(AccountType::Revenue, "Salary", None)
        .await?;

    for account in ledger.list_accounts().await? {
        println!(
            "  ✓ {} - {} ({})",
            account.id, account.name, account.account_type
        );
    }
    println!();

    // 2. Opening balances
    println!("🏦 Recording Opening Balances...");
    ledger
        .record_opening_balance(&checking.name, 250_000)
        .await?;
    ledger.record_opening_balance(&cash.name, 8_000).await?;
    println!("  ✓ Checking and cash seeded\n");

    // 3. Everyday transactions
    println!("💰 Recording Transactions...\n");
    let pay = patterns::income("March salary", &salary.name, &checking.name, 420_000)?;
    let pay_id = ledger.create_transaction(pay).await?;

    let shop = TransactionBuilder::new("Weekly groceries")
        .split(&card.name, -6_450)
        .split_with_memo(&groceries.name, 6_450, "farmers market")
        .build()?;
    let shop_id = ledger.create_transaction(shop).await?;

    let withdrawal = patterns::transfer("ATM", &checking.name, &cash.name, 10_000)?;
    ledger.create_transaction(withdrawal).await?;

    // 4. Edit the grocery run: it was paid in cash, and it cost more
    let transaction = ledger
        .get_transaction(shop_id)
        .await?
        .ok_or("grocery transaction missing")?;
    let splits = ledger.list_splits(shop_id).await?;
    let mut update = TransactionUpdate::from_existing(&transaction, &splits);
    for edit in update.splits.iter_mut() {
        if edit.account_id == card.id {
            edit.account_id = cash.id;
        }
        edit.amount = edit.amount.signum() * 7_200;
    }
    let outcome = ledger.update_complete(shop_id, update).await?;
    println!(
        "✏️  Edited groceries: {} updated, {} inserted, {} deleted\n",
        outcome.updated.len(),
        outcome.inserted.len(),
        outcome.deleted.len()
    );

    // 5. Reconcile the paycheck
    ledger
        .set_status(pay_id, TransactionStatus::Reconciled)
        .await?;
    if let Err(e) = ledger.delete_transaction(pay_id).await {
        println!("🔒 Cannot delete the paycheck: {}\n", e);
    }

    // 6. Transaction list
    println!("📋 Transactions (newest first):");
    for summary in ledger.list_transaction_summaries().await? {
        println!(
            "  {:>4} {:<18} {:<16} {:>14}  {}",
            summary.id,
            summary.description,
            summary.category,
            summary.display_amount,
            summary.display_account.unwrap_or_default()
        );
    }
    println!();

    // 7. Balances
    println!("📈 Account Balances:");
    for entry in ledger.balances(false).await? {
        println!("  {:<28} {:>14}", entry.account.name, entry.balance);
    }
    println!();

    println!("🧮 Checking register:");
    for line in ledger.account_register(checking.id).await? {
        println!(
            "  {:<18} {:>10} {:>10}",
            line.description, line.amount, line.running_balance
        );
    }
    println!();

    let report = ledger.validate_integrity().await?;
    println!("🔍 Ledger Integrity Check:");
    println!(
        "  Status: {}",
        if report.is_valid { "✓ Valid" } else { "✗ Invalid" }
    );
    println!("  Transactions: {}", report.transaction_count);
    for issue in &report.issues {
        println!("  ⚠️  {}", issue);
    }

    Ok(())
}
