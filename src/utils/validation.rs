//! Validation utilities

use crate::ledger::hierarchy;
use crate::traits::*;
use crate::types::*;

/// Validate an ISO-4217 style currency code (three uppercase letters)
pub fn validate_currency_code(code: &str) -> LedgerResult<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(LedgerError::InvalidCurrency(code.to_string()))
    }
}

/// Validate that a split amount is not zero
pub fn validate_non_zero_amount(amount: i64) -> LedgerResult<()> {
    if amount == 0 {
        Err(LedgerError::Validation(
            "Split amounts cannot be zero".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a transaction description is valid
pub fn validate_transaction_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Transaction description cannot be empty".to_string(),
        ));
    }

    if description.chars().count() > 500 {
        return Err(LedgerError::Validation(
            "Transaction description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Stricter transaction rules: required description, no zero lines
pub struct EnhancedTransactionValidator;

impl TransactionValidator for EnhancedTransactionValidator {
    fn validate_description(&self, description: &str) -> LedgerResult<()> {
        validate_transaction_description(description)
    }

    fn validate_amounts(&self, amounts: &[i64]) -> LedgerResult<()> {
        DefaultTransactionValidator.validate_amounts(amounts)?;

        for amount in amounts {
            validate_non_zero_amount(*amount)?;
        }

        Ok(())
    }
}

/// Stricter account rules: names limited to a conservative character set
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_leaf_name(&self, name: &str) -> LedgerResult<()> {
        hierarchy::validate_name(name)?;

        if !name
            .trim()
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '&' | '\'' | '.'))
        {
            return Err(LedgerError::InvalidName(format!(
                "'{}' contains unsupported characters",
                name.trim()
            )));
        }

        Ok(())
    }

    fn validate_account_deletion(&self, account: &Account, split_count: usize) -> LedgerResult<()> {
        DefaultAccountValidator::default().validate_account_deletion(account, split_count)
    }
}
