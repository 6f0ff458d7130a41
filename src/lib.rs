//! Rentledger is the back office of a property-management business.
//!
//! Administrators record rent receipts and expenses together with a photo of the
//! receipt, manage the roles of signed-in users and export transaction reports.
//! Signed-in users can browse rental listings and file maintenance requests.
//!
//! All durable data lives in a content-management backend reached through the
//! [content_store::ContentStore] port. This library provides a JSON API over it.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod asset;
mod coercion;
pub mod content_store;
mod endpoints;
mod identity;
mod listing;
mod logging;
mod maintenance;
mod role;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppConfig, AppState};
pub use asset::PollPolicy;
pub use identity::{CallerId, DEFAULT_SESSION_DURATION, set_session_cookie};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use role::{Role, assign_role};
pub use routing::build_router;

use crate::content_store::{AssetId, ContentStoreError};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// Input from the caller that was rejected before anything was written.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The amount is not a finite number.
    #[error("Amount must be a valid number.")]
    InvalidAmount,

    /// The transaction date does not look like `YYYY-MM-DD`.
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate,

    /// A new transaction was submitted without a receipt image.
    #[error("Receipt image required.")]
    MissingImage,

    /// A required field was missing or blank.
    #[error("The field {0} is required.")]
    MissingField(&'static str),

    /// The transaction type is not one of the known types.
    #[error("Type must be Income or Expense, got \"{0}\".")]
    InvalidType(String),

    /// The role is not one of the known roles.
    #[error("Role must be admin, member or tenant, got \"{0}\".")]
    InvalidRole(String),

    /// A field value could not be converted to the field's type.
    #[error("\"{value}\" is not a valid value for the field {field}.")]
    InvalidField {
        /// The field name.
        field: String,
        /// The rejected value.
        value: String,
    },
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The caller's input was rejected, nothing was written.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The multipart form could not be read.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The identity provider did not vouch for the caller.
    #[error("Sign in with the identity provider first.")]
    NotSignedIn,

    /// The caller's role does not allow the action.
    #[error("You do not have permission to do that.")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A receipt image did not finish processing within the polling budget.
    ///
    /// No record was written.
    #[error("Image processing timeout.")]
    ProcessingTimeout(AssetId),

    /// The content store could not process a receipt image.
    #[error("Image processing failed.")]
    AssetProcessingFailed(AssetId),

    /// A call to the content store failed or timed out.
    ///
    /// The string should only be logged on the server.
    #[error("the content store is unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A field that the application writes has no entry in the coercion table.
    #[error("no coercion is registered for the field {0}")]
    IncompleteCoercionTable(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A server-side timestamp could not be formatted.
    #[error("could not format the timestamp: {0}")]
    TimestampError(String),

    /// The CSV report could not be written.
    #[error("could not write the CSV report: {0}")]
    CsvError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(#[from] rusqlite::Error),
}

impl From<ContentStoreError> for Error {
    fn from(value: ContentStoreError) -> Self {
        match value {
            ContentStoreError::NotFound => Error::NotFound,
            error => Error::UpstreamUnavailable(error.to_string()),
        }
    }
}

impl From<coercion::CoercionError> for Error {
    fn from(value: coercion::CoercionError) -> Self {
        Error::Validation(ValidationError::InvalidField {
            field: value.field,
            value: value.value,
        })
    }
}

impl From<asset::UploadError> for Error {
    fn from(value: asset::UploadError) -> Self {
        match value {
            asset::UploadError::ProcessingTimeout(id) => Error::ProcessingTimeout(id),
            asset::UploadError::ProcessingFailed(id) => Error::AssetProcessingFailed(id),
            asset::UploadError::Store(error) => error.into(),
        }
    }
}

impl Error {
    /// The HTTP status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::MultipartError(_) => StatusCode::BAD_REQUEST,
            Error::NotSignedIn => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller.
    ///
    /// Internal details of server-side failures are kept out of the message.
    fn client_message(&self) -> String {
        match self {
            Error::Validation(_)
            | Error::MultipartError(_)
            | Error::NotSignedIn
            | Error::Forbidden
            | Error::ProcessingTimeout(_)
            | Error::AssetProcessingFailed(_) => self.to_string(),
            Error::NotFound => "Not found.".to_owned(),
            _ => "An unexpected error occurred, check the server logs for more details."
                .to_owned(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Error::Validation(error) => tracing::debug!("rejected input: {error}"),
            Error::NotSignedIn | Error::Forbidden | Error::NotFound => {
                tracing::debug!("{self}")
            }
            error => tracing::error!("An unexpected error occurred: {error}"),
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{
        Error, ValidationError,
        content_store::{AssetId, ContentStoreError},
    };

    async fn response_json(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests_with_message() {
        let (status, body) = response_json(ValidationError::InvalidAmount.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount must be a valid number.");
    }

    #[tokio::test]
    async fn upstream_details_are_not_shown_to_the_caller() {
        let (status, body) =
            response_json(Error::UpstreamUnavailable("disk on fire".to_owned())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("disk on fire"));
    }

    #[tokio::test]
    async fn processing_timeout_is_a_server_error() {
        let (status, body) = response_json(Error::ProcessingTimeout(AssetId::new("a"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Image processing timeout.");
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        assert_eq!(Error::from(ContentStoreError::NotFound), Error::NotFound);
        assert_eq!(
            Error::from(ContentStoreError::NotPublished),
            Error::UpstreamUnavailable("the entry is not published".to_owned())
        );
    }
}
