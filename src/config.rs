//! Ledger configuration, passed in at construction time

use serde::{Deserialize, Serialize};

use crate::ledger::hierarchy;
use crate::types::*;
use crate::utils::validation::validate_currency_code;

/// Memo carried by every split of the opening-balance transaction
pub const DEFAULT_OPENING_MEMO: &str = "Opening Balance";

/// Equity account the opening balances are booked against
pub const DEFAULT_OPENING_ACCOUNT: &str = "Equity:Opening Balances";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Currency for accounts that do not set their own
    pub default_currency: String,
    pub opening_balance_memo: String,
    pub opening_balance_account: String,
    /// Allow Reconciled -> Cleared/Pending status changes
    pub allow_reconciled_demotion: bool,
    pub max_account_name_length: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            opening_balance_memo: DEFAULT_OPENING_MEMO.to_string(),
            opening_balance_account: DEFAULT_OPENING_ACCOUNT.to_string(),
            allow_reconciled_demotion: false,
            max_account_name_length: hierarchy::MAX_NAME_LENGTH,
        }
    }
}

impl LedgerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::Validation(format!("Invalid ledger config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_reconciled_demotion(mut self, allow: bool) -> Self {
        self.allow_reconciled_demotion = allow;
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_currency_code(&self.default_currency)?;

        if self.opening_balance_memo.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Opening balance memo cannot be empty".to_string(),
            ));
        }

        if self.max_account_name_length == 0 {
            return Err(LedgerError::Validation(
                "Maximum account name length must be positive".to_string(),
            ));
        }

        let (account_type, segments) = hierarchy::parse_path(&self.opening_balance_account)?;
        if account_type != AccountType::Equity {
            return Err(LedgerError::InvalidType(format!(
                "Opening balance account must be an Equity account, got {}",
                self.opening_balance_account
            )));
        }
        for segment in segments {
            hierarchy::validate_name_with_limit(segment, self.max_account_name_length)?;
        }

        Ok(())
    }
}
