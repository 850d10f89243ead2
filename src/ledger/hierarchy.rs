//! Account naming rules: colon-delimited paths under a fixed root per type

use crate::types::*;

/// Longest allowed name segment, in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Root names that can never be used as a segment
pub const RESERVED_NAMES: [&str; 5] = ["assets", "liabilities", "equity", "revenue", "expenses"];

/// Root name for an account type code such as `"asset"` or `"Expenses"`
pub fn root_name_for_type(code: &str) -> LedgerResult<&'static str> {
    code.parse::<AccountType>().map(|t| t.root_name())
}

/// Inverse of [`AccountType::root_name`], matched case-insensitively
pub fn account_type_for_root(root: &str) -> LedgerResult<AccountType> {
    AccountType::ALL
        .into_iter()
        .find(|t| t.root_name().eq_ignore_ascii_case(root.trim()))
        .ok_or_else(|| LedgerError::InvalidType(root.to_string()))
}

/// Validate a single name segment with the default length limit
pub fn validate_name(candidate: &str) -> LedgerResult<()> {
    validate_name_with_limit(candidate, MAX_NAME_LENGTH)
}

pub fn validate_name_with_limit(candidate: &str, max_length: usize) -> LedgerResult<()> {
    let name = candidate.trim();

    if name.is_empty() {
        return Err(LedgerError::InvalidName(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.contains(ACCOUNT_SEPARATOR) {
        return Err(LedgerError::InvalidName(format!(
            "'{}' cannot contain '{}'",
            name, ACCOUNT_SEPARATOR
        )));
    }

    if name.chars().count() > max_length {
        return Err(LedgerError::InvalidName(format!(
            "Account name cannot exceed {} characters",
            max_length
        )));
    }

    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(LedgerError::InvalidName(format!(
            "'{}' is a reserved account name",
            name
        )));
    }

    Ok(())
}

/// `parent + ":" + leaf`
pub fn full_name(parent: &str, leaf: &str) -> String {
    format!("{}{}{}", parent, ACCOUNT_SEPARATOR, leaf.trim())
}

/// Everything before the last separator, `None` for a bare root
pub fn parent_path(name: &str) -> Option<&str> {
    name.rsplit_once(ACCOUNT_SEPARATOR).map(|(parent, _)| parent)
}

/// Split a full path into its root type and the segments below it
pub fn parse_path(path: &str) -> LedgerResult<(AccountType, Vec<&str>)> {
    let mut segments = path.split(ACCOUNT_SEPARATOR).map(str::trim);
    let root = segments.next().unwrap_or_default();
    let account_type = account_type_for_root(root)?;
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        return Err(LedgerError::InvalidName(format!(
            "'{}' names a root, not an account",
            path
        )));
    }
    Ok((account_type, rest))
}
