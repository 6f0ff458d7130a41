//! Transactions: rent receipts, expenses and other money movements, each with a
//! photo of its receipt.
//!
//! This module contains:
//! - The [TransactionRecord] model and the repository that stores it
//! - Validation of submitted fields
//! - The [TransactionService] that ties receipts, records and access checks together
//! - Filtering and the CSV report
//! - The route handlers

mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod export_endpoint;
mod filter;
mod form;
mod lifecycle;
mod list_endpoint;
mod read_endpoint;
mod record;
mod report;
mod repository;
mod validation;

pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use export_endpoint::export_transactions_endpoint;
pub use filter::{TransactionFilter, TransactionQuery};
pub use form::{ReceiptFile, TransactionSubmission};
pub(crate) use form::read_multipart_form;
pub use lifecycle::{SubmissionOutcome, TransactionService, TransactionView};
pub use list_endpoint::list_transactions_endpoint;
pub use read_endpoint::get_transaction_endpoint;
pub use record::{
    RECEIPT_IMAGE_FIELD, RawFields, RecordId, TRANSACTION_FIELDS, TransactionRecord,
    TransactionType,
};
pub use report::{REPORT_TITLE, Totals, write_csv_report};
pub use repository::TransactionRepository;
