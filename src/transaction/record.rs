//! The transaction record as stored in the content store.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::Serialize;

use crate::{
    ValidationError,
    content_store::{AssetId, Entry, EntryId, FieldValue, Fields, Link},
};

/// Identifies a transaction record.
pub type RecordId = EntryId;

/// Raw form values keyed by field name, before coercion.
pub type RawFields = BTreeMap<String, String>;

/// The field that links a record to its receipt image.
pub const RECEIPT_IMAGE_FIELD: &str = "receiptImage";

/// The fields a client may set on a transaction.
pub const TRANSACTION_FIELDS: &[&str] = &[
    "uniqueId",
    "tranDate",
    "type",
    "amount",
    "property",
    "payerPayee",
    "filepath",
    "notes",
];

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    /// Money received, e.g. rent.
    Income,
    /// Money spent, e.g. repairs.
    Expense,
}

impl TransactionType {
    /// The name as stored and shown to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ValidationError::InvalidType(s.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rent receipt, expense or other transaction together with its receipt link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// Assigned by the content store on creation.
    pub id: RecordId,
    /// The stored fields, including the receipt link.
    pub fields: Fields,
}

impl TransactionRecord {
    pub(crate) fn from_entry(entry: Entry) -> Self {
        Self {
            id: entry.id,
            fields: entry.fields,
        }
    }

    /// The text of the field `name`, or an empty string if it is missing or not text.
    pub fn text(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    /// The caller-supplied label of the transaction.
    pub fn unique_id(&self) -> &str {
        self.text("uniqueId")
    }

    /// The transaction date as `YYYY-MM-DD`.
    pub fn tran_date(&self) -> &str {
        self.text("tranDate")
    }

    /// The stored type, `Income` or `Expense` for records written by this application.
    pub fn transaction_type(&self) -> &str {
        self.text("type")
    }

    /// The amount, `None` if the stored value is not a number.
    pub fn amount(&self) -> Option<f64> {
        self.fields.get("amount").and_then(FieldValue::as_f64)
    }

    /// The link to the receipt image, if any.
    pub fn receipt_link(&self) -> Option<&Link> {
        self.fields
            .get(RECEIPT_IMAGE_FIELD)
            .and_then(FieldValue::as_link)
    }

    /// The ID of the receipt image, if any.
    pub fn receipt_asset(&self) -> Option<AssetId> {
        self.receipt_link().and_then(Link::asset_id)
    }
}
