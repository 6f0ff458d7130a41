//! The port to the content-management backend that holds every durable object.
//!
//! Entries (transactions, user roles, properties, maintenance requests) and assets (receipt images) live
//! behind [ContentStore]. The application never talks to storage directly, which
//! keeps the two-step asset/entry writes explicit and lets tests swap in stores that
//! misbehave on purpose.

mod fields;
mod sqlite;

use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use fields::{FieldValue, Fields, Link, LinkKind, LinkSys, LinkType};
pub use sqlite::{SqliteContentStore, initialize};

/// The content type of transaction records.
pub const TRANSACTION_CONTENT_TYPE: &str = "transactions";
/// The content type of user role entries.
pub const USER_ROLE_CONTENT_TYPE: &str = "userRole";
/// The content type of rental listings.
pub const PROPERTY_CONTENT_TYPE: &str = "property";
/// The content type of tenant maintenance requests.
pub const MAINTENANCE_CONTENT_TYPE: &str = "tenantMaintenanceRequest";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier issued by the content store.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

opaque_id!(
    /// Identifies an entry in the content store.
    EntryId
);
opaque_id!(
    /// Identifies an asset in the content store.
    AssetId
);
opaque_id!(
    /// Identifies a raw upload that an asset can be created from.
    UploadId
);

/// A structured object in the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Assigned by the store on creation, never changes.
    pub id: EntryId,
    /// The content model this entry belongs to, e.g. [TRANSACTION_CONTENT_TYPE].
    pub content_type: String,
    /// Whether the entry is externally visible.
    pub published: bool,
    /// The entry's named fields.
    pub fields: Fields,
}

/// The details needed to create an asset from an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    /// A human readable title, usually the file name.
    pub title: String,
    /// The name of the uploaded file.
    pub file_name: String,
    /// The MIME type of the uploaded file.
    pub content_type: String,
    /// The upload holding the file's bytes.
    pub upload_id: UploadId,
}

/// How far the store has got with processing an asset's binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// Created, processing has not been requested.
    Pending,
    /// Processing was requested and has not finished.
    Processing,
    /// Processing finished and the file has a URL.
    Ready,
    /// Processing gave up on the file.
    Failed,
}

impl ProcessingState {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Processing => "processing",
            ProcessingState::Ready => "ready",
            ProcessingState::Failed => "failed",
        }
    }

    pub(crate) fn parse(text: &str) -> Option<Self> {
        match text {
            "pending" => Some(ProcessingState::Pending),
            "processing" => Some(ProcessingState::Processing),
            "ready" => Some(ProcessingState::Ready),
            "failed" => Some(ProcessingState::Failed),
            _ => None,
        }
    }
}

/// An asset as currently known by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    /// Assigned by the store on creation.
    pub id: AssetId,
    /// A human readable title.
    pub title: String,
    /// The name of the stored file.
    pub file_name: String,
    /// The MIME type of the stored file.
    pub content_type: String,
    /// The retrieval address, only set once processing has finished.
    ///
    /// May be protocol-relative, e.g. `//host/path`.
    pub url: Option<String>,
    /// Processing progress as reported by the store.
    pub processing: ProcessingState,
    /// Whether the asset is externally visible.
    pub published: bool,
}

/// The bytes of a published asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFile {
    /// The name of the stored file.
    pub file_name: String,
    /// The MIME type of the stored file.
    pub content_type: String,
    /// The file contents.
    pub bytes: Vec<u8>,
}

/// Errors reported by a [ContentStore].
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ContentStoreError {
    /// No entry, asset or upload has the requested ID.
    #[error("the requested object could not be found in the content store")]
    NotFound,

    /// Tried to unpublish an entry that is not published.
    #[error("the entry is not published")]
    NotPublished,

    /// Tried to delete an entry that is still published.
    #[error("the entry must be unpublished before it can be deleted")]
    StillPublished,

    /// The store could not complete the call.
    #[error("the content store is unavailable: {0}")]
    Unavailable(String),
}

/// The operations the application needs from the content-management backend.
///
/// Every call is a potential suspension point. Implementations do not retry.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store raw bytes so that an asset can be created from them.
    async fn create_upload(&self, bytes: Vec<u8>) -> Result<UploadId, ContentStoreError>;

    /// Create an unpublished, unprocessed asset linked to an upload.
    async fn create_asset(&self, asset: NewAsset) -> Result<StoredAsset, ContentStoreError>;

    /// Ask the store to start processing an asset's binary.
    ///
    /// Processing may finish after this call returns, callers should poll
    /// [ContentStore::get_asset] until the asset has a URL.
    async fn process_asset(&self, id: &AssetId) -> Result<(), ContentStoreError>;

    /// Fetch the current state of an asset.
    async fn get_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError>;

    /// Make an asset externally visible.
    async fn publish_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError>;

    /// Fetch the bytes of a published asset.
    async fn get_asset_file(&self, id: &AssetId) -> Result<AssetFile, ContentStoreError>;

    /// Create an unpublished entry.
    async fn create_entry(
        &self,
        content_type: &str,
        fields: Fields,
    ) -> Result<Entry, ContentStoreError>;

    /// Fetch an entry by its ID, published or not.
    async fn get_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError>;

    /// Fetch the entries of a content type in creation order, optionally only those
    /// whose text field `name` equals `value`.
    async fn find_entries(
        &self,
        content_type: &str,
        field_equals: Option<(&str, &str)>,
    ) -> Result<Vec<Entry>, ContentStoreError>;

    /// Replace all fields of an entry.
    ///
    /// Fields missing from `fields` are removed from the entry.
    async fn update_entry(&self, id: &EntryId, fields: Fields)
    -> Result<Entry, ContentStoreError>;

    /// Make an entry externally visible.
    async fn publish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError>;

    /// Hide a published entry.
    ///
    /// Returns [ContentStoreError::NotPublished] if the entry is not published.
    async fn unpublish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError>;

    /// Permanently delete an unpublished entry.
    ///
    /// Returns [ContentStoreError::StillPublished] if the entry is published.
    async fn delete_entry(&self, id: &EntryId) -> Result<(), ContentStoreError>;
}
