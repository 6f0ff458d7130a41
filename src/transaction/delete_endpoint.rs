//! Defines the endpoint for deleting a transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{Error, content_store::EntryId, identity::CallerId};

use super::TransactionService;

/// A route handler for deleting a transaction, responds with `{"message"}`.
///
/// The receipt image is kept.
pub async fn delete_transaction_endpoint(
    State(service): State<TransactionService>,
    Extension(caller): Extension<CallerId>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Value>, Error> {
    service
        .delete(&caller, &EntryId::new(transaction_id))
        .await?;

    Ok(Json(json!({ "message": "Transaction deleted." })))
}
