//! Defines the endpoint for editing a transaction.

use axum::{
    Extension,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
};

use crate::{Error, content_store::EntryId, identity::CallerId};

use super::{TransactionService, TransactionSubmission, create_endpoint::outcome_response};

/// A route handler for editing a transaction from a multipart form.
///
/// Only the fields in the form are changed. Without a new receipt file, the
/// existing receipt stays linked.
pub async fn edit_transaction_endpoint(
    State(service): State<TransactionService>,
    Extension(caller): Extension<CallerId>,
    Path(transaction_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, Error> {
    let submission = TransactionSubmission::from_multipart(multipart).await?;
    let outcome = service
        .edit(&caller, &EntryId::new(transaction_id), submission)
        .await?;

    Ok(outcome_response(outcome, StatusCode::OK, "Transaction updated."))
}
