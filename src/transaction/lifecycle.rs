//! Creates, edits and deletes transactions together with their receipt images.
//!
//! The receipt and the record are written in two steps without a transaction
//! spanning both. When the receipt was stored but the record write failed, the
//! result is [SubmissionOutcome::PartiallyFailed] with the ID of the orphaned asset.

use axum::extract::FromRef;

use crate::{
    AppState, Error, ValidationError,
    asset::AssetStore,
    content_store::{AssetId, Link},
    identity::CallerId,
    role::{AccessGuard, Action},
};

use super::{
    RecordId, TransactionFilter, TransactionRecord, TransactionRepository,
    TransactionSubmission,
    validation::{validate_new, validate_patch},
};

/// How a create or edit ended when it got past validation.
#[derive(Debug, PartialEq)]
pub enum SubmissionOutcome {
    /// The record was written.
    Success(RecordId),
    /// The receipt was uploaded but the record could not be written.
    ///
    /// The asset is published but nothing links to it.
    PartiallyFailed {
        /// The uploaded receipt.
        asset_id: AssetId,
        /// Why the record write failed.
        error: Error,
    },
}

/// A transaction together with the address of its receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView {
    /// The stored record.
    pub record: TransactionRecord,
    /// The absolute URL of the receipt, if it has one.
    pub receipt_url: Option<String>,
}

/// Runs the transaction operations for a caller.
#[derive(Clone)]
pub struct TransactionService {
    repository: TransactionRepository,
    assets: AssetStore,
    guard: AccessGuard,
}

impl FromRef<AppState> for TransactionService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            TransactionRepository::new(state.content_store.clone()),
            AssetStore::new(state.content_store.clone(), state.poll_policy),
            AccessGuard::from_ref(state),
        )
    }
}

impl TransactionService {
    /// Create a service from its parts.
    pub fn new(repository: TransactionRepository, assets: AssetStore, guard: AccessGuard) -> Self {
        Self {
            repository,
            assets,
            guard,
        }
    }

    /// Validate `submission`, upload its receipt and create the record.
    ///
    /// Nothing is written if validation fails or the upload fails.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] for non-admins, [Error::Validation] for bad input,
    /// or an upload error.
    pub async fn create(
        &self,
        caller: &CallerId,
        submission: TransactionSubmission,
    ) -> Result<SubmissionOutcome, Error> {
        self.guard
            .authorize(caller, Action::MutateTransactions)
            .await?;

        let fields = validate_new(submission.fields, submission.receipt.is_some())?;
        let receipt = submission
            .receipt
            .ok_or(ValidationError::MissingImage)?;

        let asset = self
            .assets
            .upload(receipt.bytes, &receipt.file_name, &receipt.content_type)
            .await?;

        match self.repository.create(&fields, &asset.id).await {
            Ok(id) => {
                tracing::info!("{caller} created transaction {id} with receipt {}", asset.id);
                Ok(SubmissionOutcome::Success(id))
            }
            Err(error) => Ok(partially_failed(asset.id, error)),
        }
    }

    /// Validate the fields in `submission` and apply them to the record `id`.
    ///
    /// A new receipt replaces the old link. Without one, the existing link is kept.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] for non-admins, [Error::Validation] for bad input,
    /// [Error::NotFound] if the record does not exist, or a store or upload error.
    pub async fn edit(
        &self,
        caller: &CallerId,
        id: &RecordId,
        submission: TransactionSubmission,
    ) -> Result<SubmissionOutcome, Error> {
        self.guard
            .authorize(caller, Action::MutateTransactions)
            .await?;

        let patch = validate_patch(submission.fields)?;
        let existing = self.repository.read(id).await?;

        let Some(receipt) = submission.receipt else {
            let link = existing.receipt_link().cloned();
            self.repository.update(id, &patch, link).await?;
            tracing::info!("{caller} edited transaction {id}");

            return Ok(SubmissionOutcome::Success(id.clone()));
        };

        let asset = self
            .assets
            .upload(receipt.bytes, &receipt.file_name, &receipt.content_type)
            .await?;

        match self
            .repository
            .update(id, &patch, Some(Link::asset(&asset.id)))
            .await
        {
            Ok(_) => {
                if let Some(previous) = existing.receipt_asset() {
                    tracing::info!("receipt {previous} of transaction {id} was replaced");
                }
                tracing::info!("{caller} edited transaction {id} with receipt {}", asset.id);
                Ok(SubmissionOutcome::Success(id.clone()))
            }
            Err(error) => Ok(partially_failed(asset.id, error)),
        }
    }

    /// Delete the record `id`.
    ///
    /// The receipt image is not deleted.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] for non-admins, [Error::NotFound] if the record does
    /// not exist, or a store error.
    pub async fn delete(&self, caller: &CallerId, id: &RecordId) -> Result<(), Error> {
        self.guard
            .authorize(caller, Action::MutateTransactions)
            .await?;

        let orphan = self.repository.delete(id).await?;

        match orphan {
            Some(asset_id) => {
                tracing::info!("{caller} deleted transaction {id}, receipt {asset_id} is orphaned")
            }
            None => tracing::info!("{caller} deleted transaction {id}"),
        }

        Ok(())
    }

    /// Get the record `id` and the URL of its receipt.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] for non-admins, [Error::NotFound] if the record does
    /// not exist, or [Error::UpstreamUnavailable] if the record or its receipt cannot
    /// be fetched.
    pub async fn view(&self, caller: &CallerId, id: &RecordId) -> Result<TransactionView, Error> {
        self.guard.authorize(caller, Action::ViewTransactions).await?;

        let record = self.repository.read(id).await?;
        let receipt_url = match record.receipt_asset() {
            Some(asset_id) => self
                .assets
                .lookup_url(&asset_id)
                .await
                .map_err(|error| {
                    // A missing receipt is a broken link, not a missing record.
                    Error::UpstreamUnavailable(format!(
                        "could not look up receipt {asset_id} of {id}: {error}"
                    ))
                })?,
            None => None,
        };

        Ok(TransactionView {
            record,
            receipt_url,
        })
    }

    /// Get every record that matches `filter`, in creation order.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] for non-admins, or a store error.
    pub async fn list(
        &self,
        caller: &CallerId,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, Error> {
        self.guard.authorize(caller, Action::ViewTransactions).await?;

        let records = self.repository.list().await?;

        Ok(filter.apply(records))
    }
}

fn partially_failed(asset_id: AssetId, error: Error) -> SubmissionOutcome {
    tracing::warn!("receipt {asset_id} was uploaded but the record could not be written: {error}");

    SubmissionOutcome::PartiallyFailed { asset_id, error }
}
