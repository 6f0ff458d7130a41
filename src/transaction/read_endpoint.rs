//! Defines the endpoint for reading a single transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    Error,
    content_store::{EntryId, FieldValue},
    identity::CallerId,
};

use super::TransactionService;

/// A route handler that responds with `{"fields": {...}}` for a transaction.
///
/// Links keep their structure. If the receipt has a URL, it is added as
/// `receiptImageUrl`.
pub async fn get_transaction_endpoint(
    State(service): State<TransactionService>,
    Extension(caller): Extension<CallerId>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Value>, Error> {
    let view = service
        .view(&caller, &EntryId::new(transaction_id))
        .await?;

    let mut fields = view.record.fields;
    if let Some(url) = view.receipt_url {
        fields.insert("receiptImageUrl".to_owned(), FieldValue::Text(url));
    }

    Ok(Json(json!({ "fields": fields })))
}
