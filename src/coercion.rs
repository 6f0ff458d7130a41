//! The table that decides how raw form text becomes a typed field value.
//!
//! Every field this application writes must be listed in [FIELD_COERCIONS].
//! [verify_coverage] is run when the app state is built so that a missing entry is
//! caught at startup instead of silently storing a number as text.

use crate::content_store::FieldValue;

/// How to turn raw text into a [FieldValue].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Store the text unchanged.
    Identity,
    /// Parse a finite decimal number.
    Float,
    /// Parse a base-10 integer.
    Integer,
    /// `"true"` is true, anything else is false.
    Boolean,
}

/// The coercion for each known field name, across all content types.
pub const FIELD_COERCIONS: &[(&str, Coercion)] = &[
    // transactions
    ("uniqueId", Coercion::Identity),
    ("tranDate", Coercion::Identity),
    ("type", Coercion::Identity),
    ("amount", Coercion::Float),
    ("property", Coercion::Identity),
    ("payerPayee", Coercion::Identity),
    ("filepath", Coercion::Identity),
    ("notes", Coercion::Identity),
    // userRole
    ("userId", Coercion::Identity),
    ("role", Coercion::Identity),
    ("userName", Coercion::Identity),
    ("email", Coercion::Identity),
    ("firstName", Coercion::Identity),
    ("lastName", Coercion::Identity),
    // property
    ("bedroomsNum", Coercion::Integer),
    ("bathroomsnumber", Coercion::Integer),
    ("publishProperty", Coercion::Boolean),
    ("notifySubscribers", Coercion::Boolean),
    // tenantMaintenanceRequest
    ("subject", Coercion::Identity),
    ("description", Coercion::Identity),
    ("dateSubmitted", Coercion::Identity),
    ("status", Coercion::Identity),
];

/// A raw value that the field's coercion rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{value}\" is not a valid value for the field {field}")]
pub struct CoercionError {
    /// The field name.
    pub field: String,
    /// The rejected raw value.
    pub value: String,
}

/// Look up the coercion for `field`.
pub fn coercion_for(field: &str) -> Option<Coercion> {
    FIELD_COERCIONS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, coercion)| *coercion)
}

/// Convert `raw` into a typed value for `field`.
///
/// Fields missing from the table are stored as text.
///
/// # Errors
/// Returns a [CoercionError] if `raw` cannot be parsed as the field's type.
pub fn coerce(field: &str, raw: &str) -> Result<FieldValue, CoercionError> {
    let coercion = coercion_for(field).unwrap_or_else(|| {
        tracing::warn!("no coercion registered for field \"{field}\", storing it as text");
        Coercion::Identity
    });

    let invalid = || CoercionError {
        field: field.to_owned(),
        value: raw.to_owned(),
    };

    match coercion {
        Coercion::Identity => Ok(FieldValue::Text(raw.to_owned())),
        Coercion::Float => parse_finite(raw).map(FieldValue::Number).ok_or_else(invalid),
        Coercion::Integer => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| invalid()),
        Coercion::Boolean => Ok(FieldValue::Bool(raw == "true")),
    }
}

/// Parse `raw` as a finite number, ignoring surrounding whitespace.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

/// Check that every name in `schemas` has an entry in [FIELD_COERCIONS].
///
/// # Errors
/// Returns the first field name without a coercion.
pub fn verify_coverage(schemas: &[&[&str]]) -> Result<(), String> {
    schemas
        .iter()
        .flat_map(|fields| fields.iter())
        .find(|field| coercion_for(field).is_none())
        .map_or(Ok(()), |field| Err((*field).to_owned()))
}
