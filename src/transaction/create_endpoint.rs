//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{Error, identity::CallerId};

use super::{SubmissionOutcome, TransactionService, TransactionSubmission};

/// A route handler for creating a new transaction from a multipart form.
///
/// Responds with 201 and `{"message", "entryId"}` on success.
pub async fn create_transaction_endpoint(
    State(service): State<TransactionService>,
    Extension(caller): Extension<CallerId>,
    multipart: Multipart,
) -> Result<Response, Error> {
    let submission = TransactionSubmission::from_multipart(multipart).await?;
    let outcome = service.create(&caller, submission).await?;

    Ok(outcome_response(
        outcome,
        StatusCode::CREATED,
        "Transaction created",
    ))
}

/// Turn the outcome of a create or edit into a JSON response.
///
/// A partial failure is reported as a server error that names the orphaned asset.
pub(super) fn outcome_response(
    outcome: SubmissionOutcome,
    success_status: StatusCode,
    message: &str,
) -> Response {
    match outcome {
        SubmissionOutcome::Success(id) => (
            success_status,
            Json(json!({ "message": message, "entryId": id })),
        )
            .into_response(),
        SubmissionOutcome::PartiallyFailed { asset_id, error } => {
            tracing::error!("transaction write failed after uploading receipt {asset_id}: {error}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "The receipt was uploaded but the transaction could not be saved.",
                    "orphanedAssetId": asset_id,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::Value;

    use crate::{
        Role,
        content_store::{ContentStore, EntryId, FieldValue},
        endpoints,
        test_utils::{FaultyContentStore, TestApp},
    };

    fn tx1_form() -> MultipartForm {
        MultipartForm::new()
            .add_text("uniqueId", "TX-1")
            .add_text("tranDate", "2024-03-15")
            .add_text("type", "Income")
            .add_text("amount", "1500.50")
            .add_text("property", "Unit A")
            .add_text("payerPayee", "J. Doe")
            .add_part(
                "receiptImage",
                Part::bytes(vec![0xFF, 0xD8, 0xFF])
                    .file_name("receipt.jpg")
                    .mime_type("image/jpeg"),
            )
    }

    #[tokio::test]
    async fn creates_transaction() {
        let app = TestApp::new();
        let cookie = app.sign_in_as("boss", Role::Admin).await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(tx1_form())
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["message"], "Transaction created");
        let id = EntryId::new(body["entryId"].as_str().unwrap());
        let entry = app.store.get_entry(&id).await.unwrap();
        assert_eq!(entry.fields["amount"], FieldValue::Number(1500.5));
        assert_eq!(entry.fields["notes"], FieldValue::Text(String::new()));
        assert!(entry.published);
    }

    #[tokio::test]
    async fn missing_receipt_is_bad_request() {
        let app = TestApp::new();
        let cookie = app.sign_in_as("boss", Role::Admin).await;
        let form = MultipartForm::new()
            .add_text("uniqueId", "TX-1")
            .add_text("tranDate", "2024-03-15")
            .add_text("type", "Income")
            .add_text("amount", "10");

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "Receipt image required.");
    }

    #[tokio::test]
    async fn invalid_amount_is_bad_request() {
        let app = TestApp::new();
        let cookie = app.sign_in_as("boss", Role::Admin).await;
        let form = tx1_form().add_text("amount", "abc");

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "Amount must be a valid number."
        );
        assert_eq!(app.store.uploads(), 0);
    }

    #[tokio::test]
    async fn member_is_forbidden() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_a").await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(tx1_form())
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(app.store.uploads(), 0);
    }

    #[tokio::test]
    async fn processing_timeout_is_server_error() {
        let app = TestApp::with_store(FaultyContentStore::default().never_finish_processing());
        let cookie = app.sign_in_as("boss", Role::Admin).await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(tx1_form())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json::<Value>()["error"],
            "Image processing timeout."
        );
    }

    #[tokio::test]
    async fn partial_failure_names_orphaned_asset() {
        let app = TestApp::with_store(FaultyContentStore::default().fail_transaction_writes());
        let cookie = app.sign_in_as("boss", Role::Admin).await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie)
            .multipart(tx1_form())
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json::<Value>();
        assert!(body["error"].is_string());
        assert!(body["orphanedAssetId"].is_string());
    }
}
