//! Checks on submitted transaction fields that run before anything is written.

use std::sync::LazyLock;

use regex::Regex;

use crate::{ValidationError, coercion::parse_finite};

use super::{RawFields, TransactionType};

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern is a valid regex")
});

/// The optional fields that are stored as empty text when a new transaction omits them.
const DEFAULTED_FIELDS: &[&str] = &["property", "payerPayee", "filepath", "notes"];

/// Check the fields of a new transaction.
///
/// Returns the fields with the type normalised to `Income` or `Expense` and missing
/// optional fields set to an empty string.
///
/// # Errors
/// Returns the first problem found, checking the receipt, amount, date, unique ID and
/// type in that order.
pub fn validate_new(mut fields: RawFields, has_receipt: bool) -> Result<RawFields, ValidationError> {
    if !has_receipt {
        return Err(ValidationError::MissingImage);
    }

    check_amount(fields.get("amount").map(String::as_str).unwrap_or_default())?;
    check_date(fields.get("tranDate").map(String::as_str).unwrap_or_default())?;

    if fields
        .get("uniqueId")
        .is_none_or(|unique_id| unique_id.trim().is_empty())
    {
        return Err(ValidationError::MissingField("uniqueId"));
    }

    let transaction_type = match fields.get("type") {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<TransactionType>()?,
        _ => return Err(ValidationError::MissingField("type")),
    };
    fields.insert("type".to_owned(), transaction_type.to_string());

    for name in DEFAULTED_FIELDS {
        fields.entry((*name).to_owned()).or_default();
    }

    Ok(fields)
}

/// Check the fields of an edit.
///
/// Only the fields present in `patch` are checked, since the stored record already
/// passed validation when it was created.
///
/// # Errors
/// Returns the first problem found.
pub fn validate_patch(mut patch: RawFields) -> Result<RawFields, ValidationError> {
    if let Some(amount) = patch.get("amount") {
        check_amount(amount)?;
    }

    if let Some(date) = patch.get("tranDate") {
        check_date(date)?;
    }

    if patch
        .get("uniqueId")
        .is_some_and(|unique_id| unique_id.trim().is_empty())
    {
        return Err(ValidationError::MissingField("uniqueId"));
    }

    if let Some(raw) = patch.get("type") {
        let transaction_type: TransactionType = raw.parse()?;
        patch.insert("type".to_owned(), transaction_type.to_string());
    }

    Ok(patch)
}

fn check_amount(raw: &str) -> Result<(), ValidationError> {
    parse_finite(raw)
        .map(|_| ())
        .ok_or(ValidationError::InvalidAmount)
}

/// Check that `raw` looks like `YYYY-MM-DD`.
pub fn check_date(raw: &str) -> Result<(), ValidationError> {
    if DATE_PATTERN.is_match(raw) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate)
    }
}
