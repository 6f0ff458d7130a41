//! Validates maintenance requests and stores them together with their photo.
//!
//! Like transactions, the photo and the request are written in two steps. When the
//! photo was stored but the request could not be written, the outcome is
//! [SubmissionOutcome::PartiallyFailed].

use std::sync::Arc;

use axum::extract::{FromRef, Multipart};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    AppState, Error, ValidationError,
    asset::AssetStore,
    coercion::coerce,
    content_store::{ContentStore, FieldValue, Fields, Link, MAINTENANCE_CONTENT_TYPE},
    identity::CallerId,
    role::{AccessGuard, Action},
    transaction::{RawFields, ReceiptFile, RecordId, SubmissionOutcome, read_multipart_form},
};

/// The text fields of a maintenance request entry.
pub const MAINTENANCE_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "email",
    "subject",
    "description",
    "dateSubmitted",
    "status",
];

/// The field that links a request to its photo.
pub const MAINTENANCE_IMAGE_FIELD: &str = "image";

/// The status of every new request.
pub const PENDING_STATUS: &str = "pending";

/// The fields the tenant fills in. The rest are set here.
const TENANT_FIELDS: &[&str] = &["firstName", "lastName", "email", "subject", "description"];

/// The fields and optional photo from a maintenance request form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceSubmission {
    /// The tenant's fields that were present in the form.
    pub fields: RawFields,
    /// A photo of the problem.
    pub image: Option<ReceiptFile>,
}

impl MaintenanceSubmission {
    /// Read a submission from `multipart`.
    ///
    /// Only the fields a tenant fills in are read, so a client cannot set the status
    /// or the submission date.
    ///
    /// # Errors
    /// Returns [Error::MultipartError] if the form cannot be read.
    pub async fn from_multipart(multipart: Multipart) -> Result<Self, Error> {
        let (fields, image) =
            read_multipart_form(multipart, TENANT_FIELDS, MAINTENANCE_IMAGE_FIELD, "photo")
                .await?;

        Ok(Self { fields, image })
    }
}

/// Files maintenance requests for signed-in callers.
#[derive(Clone)]
pub struct MaintenanceService {
    store: Arc<dyn ContentStore>,
    assets: AssetStore,
    guard: AccessGuard,
}

impl FromRef<AppState> for MaintenanceService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.content_store.clone(),
            AssetStore::new(state.content_store.clone(), state.poll_policy),
            AccessGuard::from_ref(state),
        )
    }
}

impl MaintenanceService {
    /// Create a service from its parts.
    pub fn new(store: Arc<dyn ContentStore>, assets: AssetStore, guard: AccessGuard) -> Self {
        Self {
            store,
            assets,
            guard,
        }
    }

    /// Validate `submission`, upload its photo and store the request as pending.
    ///
    /// `submitted_at` is stored as the submission date. Nothing is written if
    /// validation fails or the upload fails.
    ///
    /// # Errors
    /// Returns [Error::Validation] for bad input, or an upload error.
    pub async fn submit(
        &self,
        caller: &CallerId,
        submission: MaintenanceSubmission,
        submitted_at: OffsetDateTime,
    ) -> Result<SubmissionOutcome, Error> {
        self.guard
            .authorize(caller, Action::SubmitMaintenance)
            .await?;

        let mut fields = validate(submission.fields)?;
        let date_submitted = submitted_at
            .format(&Rfc3339)
            .map_err(|error| Error::TimestampError(error.to_string()))?;
        fields.insert("dateSubmitted".to_owned(), date_submitted);
        fields.insert("status".to_owned(), PENDING_STATUS.to_owned());

        let mut typed = fields
            .iter()
            .map(|(name, raw)| -> Result<(String, FieldValue), Error> {
                Ok((name.clone(), coerce(name, raw)?))
            })
            .collect::<Result<Fields, Error>>()?;

        let Some(image) = submission.image else {
            let id = self.write_request(typed).await?;
            tracing::info!("{caller} filed maintenance request {id}");

            return Ok(SubmissionOutcome::Success(id));
        };

        let asset = self
            .assets
            .upload(image.bytes, &image.file_name, &image.content_type)
            .await?;
        typed.insert(
            MAINTENANCE_IMAGE_FIELD.to_owned(),
            Link::asset(&asset.id).into(),
        );

        match self.write_request(typed).await {
            Ok(id) => {
                tracing::info!("{caller} filed maintenance request {id} with photo {}", asset.id);
                Ok(SubmissionOutcome::Success(id))
            }
            Err(error) => {
                tracing::warn!(
                    "photo {} was uploaded but the maintenance request could not be written: {error}",
                    asset.id
                );
                Ok(SubmissionOutcome::PartiallyFailed {
                    asset_id: asset.id,
                    error,
                })
            }
        }
    }

    /// Create and publish the request entry, deleting the draft if it cannot be
    /// published.
    async fn write_request(&self, fields: Fields) -> Result<RecordId, Error> {
        let entry = self
            .store
            .create_entry(MAINTENANCE_CONTENT_TYPE, fields)
            .await?;

        if let Err(error) = self.store.publish_entry(&entry.id).await {
            if let Err(cleanup_error) = self.store.delete_entry(&entry.id).await {
                tracing::error!(
                    "could not delete unpublished maintenance request {}: {cleanup_error}",
                    entry.id
                );
            }

            return Err(error.into());
        }

        Ok(entry.id)
    }
}

/// Check that every tenant field is filled in and the email address is plausible.
///
/// Returns the tenant fields with surrounding whitespace removed. Other fields are
/// dropped.
fn validate(fields: RawFields) -> Result<RawFields, ValidationError> {
    let mut checked = RawFields::new();

    for &field in TENANT_FIELDS {
        let value = fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingField(field))?;
        checked.insert(field.to_owned(), value.to_owned());
    }

    let email = checked.get("email").map(String::as_str).unwrap_or_default();
    if !is_plausible_email(email) {
        return Err(ValidationError::InvalidField {
            field: "email".to_owned(),
            value: email.to_owned(),
        });
    }

    Ok(checked)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
