//! Reads and writes transaction records in the content store.

use std::sync::Arc;

use crate::{
    Error,
    coercion::coerce,
    content_store::{
        AssetId, ContentStore, ContentStoreError, Entry, EntryId, FieldValue, Fields, Link,
        TRANSACTION_CONTENT_TYPE,
    },
};

use super::{RECEIPT_IMAGE_FIELD, RawFields, RecordId, TransactionRecord};

/// Stores transaction records as published entries.
#[derive(Clone)]
pub struct TransactionRepository {
    store: Arc<dyn ContentStore>,
}

impl TransactionRepository {
    /// Create a repository backed by `store`.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Create and publish a record from `fields` that links to `receipt`.
    ///
    /// Each field is converted with the field coercion table. If the new entry cannot
    /// be published, it is deleted again.
    ///
    /// # Errors
    /// Returns an error if a field cannot be coerced or a content store call fails.
    pub async fn create(&self, fields: &RawFields, receipt: &AssetId) -> Result<RecordId, Error> {
        let mut typed = coerce_fields(fields)?;
        typed.insert(RECEIPT_IMAGE_FIELD.to_owned(), Link::asset(receipt).into());

        let entry = self
            .store
            .create_entry(TRANSACTION_CONTENT_TYPE, typed)
            .await?;

        if let Err(error) = self.store.publish_entry(&entry.id).await {
            match self.store.delete_entry(&entry.id).await {
                Ok(()) => tracing::debug!("deleted unpublished draft {}", entry.id),
                Err(cleanup_error) => tracing::error!(
                    "could not delete unpublished draft {}: {cleanup_error}",
                    entry.id
                ),
            }

            return Err(error.into());
        }

        Ok(entry.id)
    }

    /// Get the record `id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no transaction with `id`, or an error if
    /// the content store call fails.
    pub async fn read(&self, id: &RecordId) -> Result<TransactionRecord, Error> {
        self.get_transaction_entry(id)
            .await
            .map(TransactionRecord::from_entry)
    }

    /// Change the fields present in `patch` and publish the record.
    ///
    /// Fields missing from `patch` keep their stored values. If `receipt` is given, the
    /// record is linked to it. If the change cannot be published, the previous fields
    /// are written back.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no transaction with `id`, or an error if a
    /// field cannot be coerced or a content store call fails.
    pub async fn update(
        &self,
        id: &RecordId,
        patch: &RawFields,
        receipt: Option<Link>,
    ) -> Result<TransactionRecord, Error> {
        let previous = self.get_transaction_entry(id).await?.fields;
        let mut fields = previous.clone();
        fields.extend(coerce_fields(patch)?);
        if let Some(link) = receipt {
            fields.insert(RECEIPT_IMAGE_FIELD.to_owned(), link.into());
        }

        self.store.update_entry(id, fields).await?;

        match self.store.publish_entry(id).await {
            Ok(entry) => Ok(TransactionRecord::from_entry(entry)),
            Err(error) => {
                if let Err(restore_error) = self.store.update_entry(id, previous).await {
                    tracing::error!(
                        "could not restore transaction {id} after a failed publish: {restore_error}"
                    );
                }

                Err(error.into())
            }
        }
    }

    /// Unpublish and delete the record `id`.
    ///
    /// A record that is already unpublished is deleted without error. The receipt is
    /// left in place and its ID returned so it can be cleaned up separately.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no transaction with `id`, or an error if a
    /// content store call fails.
    pub async fn delete(&self, id: &RecordId) -> Result<Option<AssetId>, Error> {
        let record = self.read(id).await?;

        match self.store.unpublish_entry(id).await {
            Ok(_) => {}
            Err(ContentStoreError::NotPublished) => {
                tracing::debug!("transaction {id} was already unpublished");
            }
            Err(error) => return Err(error.into()),
        }

        self.store.delete_entry(id).await?;

        Ok(record.receipt_asset())
    }

    /// Get every published transaction record in creation order.
    ///
    /// # Errors
    /// Returns an error if the content store call fails.
    pub async fn list(&self) -> Result<Vec<TransactionRecord>, Error> {
        let entries = self
            .store
            .find_entries(TRANSACTION_CONTENT_TYPE, None)
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.published)
            .map(TransactionRecord::from_entry)
            .collect())
    }

    async fn get_transaction_entry(&self, id: &EntryId) -> Result<Entry, Error> {
        let entry = self.store.get_entry(id).await?;

        if entry.content_type == TRANSACTION_CONTENT_TYPE {
            Ok(entry)
        } else {
            Err(Error::NotFound)
        }
    }
}

fn coerce_fields(fields: &RawFields) -> Result<Fields, Error> {
    fields
        .iter()
        .map(|(name, raw)| -> Result<(String, FieldValue), Error> {
            Ok((name.clone(), coerce(name, raw)?))
        })
        .collect()
}
