//! Defines the endpoint for filing a maintenance request.

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::OffsetDateTime;

use crate::{Error, identity::CallerId, transaction::SubmissionOutcome};

use super::{MaintenanceService, MaintenanceSubmission};

/// A route handler for filing a maintenance request from a multipart form.
///
/// Any signed-in caller may file a request. Responds with 201 and
/// `{"message", "entryId"}` on success.
pub async fn submit_maintenance_request_endpoint(
    State(service): State<MaintenanceService>,
    Extension(caller): Extension<CallerId>,
    multipart: Multipart,
) -> Result<Response, Error> {
    let submission = MaintenanceSubmission::from_multipart(multipart).await?;
    let outcome = service
        .submit(&caller, submission, OffsetDateTime::now_utc())
        .await?;

    let response = match outcome {
        SubmissionOutcome::Success(id) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Maintenance request submitted", "entryId": id })),
        )
            .into_response(),
        SubmissionOutcome::PartiallyFailed { asset_id, error } => {
            tracing::error!(
                "maintenance request write failed after uploading photo {asset_id}: {error}"
            );

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "The photo was uploaded but the maintenance request could not be saved.",
                    "orphanedAssetId": asset_id,
                })),
            )
                .into_response()
        }
    };

    Ok(response)
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
        maintenance::request::{MAINTENANCE_IMAGE_FIELD, PENDING_STATUS},
        test_utils::{FaultyContentStore, TestApp},
    };

    fn leaking_tap_form() -> MultipartForm {
        MultipartForm::new()
            .add_text("firstName", "Jane")
            .add_text("lastName", "Doe")
            .add_text("email", "jane@example.com")
            .add_text("subject", "Leaking tap")
            .add_text("description", "The kitchen tap drips all night.")
    }

    fn tap_photo() -> Part {
        Part::bytes(vec![0xFF, 0xD8, 0xFF])
            .file_name("tap.jpg")
            .mime_type("image/jpeg")
    }

    #[tokio::test]
    async fn tenant_files_request_with_photo() {
        let app = TestApp::new();
        let cookie = app.sign_in_as("tenant_1", Role::Tenant).await;

        let response = app
            .server
            .post(endpoints::MAINTENANCE_REQUESTS)
            .add_cookie(cookie)
            .multipart(leaking_tap_form().add_part("image", tap_photo()))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["message"], "Maintenance request submitted");
        let id = EntryId::new(body["entryId"].as_str().unwrap());
        let entry = app.store.get_entry(&id).await.unwrap();
        assert_eq!(
            entry.fields["status"],
            FieldValue::Text(PENDING_STATUS.to_owned())
        );
        assert!(matches!(
            entry.fields[MAINTENANCE_IMAGE_FIELD],
            FieldValue::Link(_)
        ));
        assert_eq!(app.store.uploads(), 1);
    }

    #[tokio::test]
    async fn member_files_request_without_photo() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_a").await;

        let response = app
            .server
            .post(endpoints::MAINTENANCE_REQUESTS)
            .add_cookie(cookie)
            .multipart(leaking_tap_form().add_text("status", "done"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let id = EntryId::new(response.json::<Value>()["entryId"].as_str().unwrap());
        let entry = app.store.get_entry(&id).await.unwrap();
        assert_eq!(
            entry.fields["status"],
            FieldValue::Text(PENDING_STATUS.to_owned())
        );
        assert!(!entry.fields.contains_key(MAINTENANCE_IMAGE_FIELD));
        assert_eq!(app.store.uploads(), 0);
    }

    #[tokio::test]
    async fn missing_description_is_bad_request() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_a").await;
        let form = MultipartForm::new()
            .add_text("firstName", "Jane")
            .add_text("lastName", "Doe")
            .add_text("email", "jane@example.com")
            .add_text("subject", "Leaking tap")
            .add_part("image", tap_photo());

        let response = app
            .server
            .post(endpoints::MAINTENANCE_REQUESTS)
            .add_cookie(cookie)
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "The field description is required."
        );
        assert_eq!(app.store.uploads(), 0);
    }

    #[tokio::test]
    async fn partial_failure_names_orphaned_photo() {
        let app = TestApp::with_store(FaultyContentStore::default().fail_maintenance_writes());
        let cookie = app.sign_in("user_a").await;

        let response = app
            .server
            .post(endpoints::MAINTENANCE_REQUESTS)
            .add_cookie(cookie)
            .multipart(leaking_tap_form().add_part("image", tap_photo()))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.json::<Value>()["orphanedAssetId"].is_string());
    }

    #[tokio::test]
    async fn anonymous_caller_is_sent_to_sign_in() {
        let app = TestApp::new();

        let response = app
            .server
            .post(endpoints::MAINTENANCE_REQUESTS)
            .multipart(leaking_tap_form())
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(app.store.uploads(), 0);
    }
}
