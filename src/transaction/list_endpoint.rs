//! Defines the bulk export endpoint for transactions.

use axum::{
    Extension, Json,
    extract::State,
};
use axum_extra::extract::Query;
use serde_json::{Map, Value, json};

use crate::{Error, identity::CallerId};

use super::{TransactionFilter, TransactionQuery, TransactionRecord, TransactionService};

/// A route handler that responds with `{"transactions": [...]}` for every transaction
/// matching the query string.
///
/// Each transaction carries its `id` and a `receiptAttached` flag instead of the
/// receipt itself.
pub async fn list_transactions_endpoint(
    State(service): State<TransactionService>,
    Extension(caller): Extension<CallerId>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Value>, Error> {
    let filter = TransactionFilter::try_from(query)?;
    let records = service.list(&caller, &filter).await?;

    let transactions: Vec<Value> = records.into_iter().map(export_row).collect();

    Ok(Json(json!({ "transactions": transactions })))
}

fn export_row(record: TransactionRecord) -> Value {
    let receipt_attached = record.receipt_asset().is_some();
    let mut row = Map::new();

    row.insert("id".to_owned(), json!(record.id));
    for (name, value) in record.fields {
        row.insert(name, json!(value));
    }
    row.insert("receiptAttached".to_owned(), Value::Bool(receipt_attached));

    Value::Object(row)
}
