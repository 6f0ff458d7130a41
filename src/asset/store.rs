//! Uploads receipt images and waits until they can be retrieved.

use std::{sync::Arc, time::Duration};

use crate::content_store::{
    AssetId, ContentStore, ContentStoreError, NewAsset, ProcessingState, StoredAsset,
};

/// The lifecycle of an asset as observed by polling the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// The bytes are stored but processing has not been requested.
    Uploading,
    /// The store is generating variants and metadata for the file.
    Processing,
    /// The file has a URL and can be published.
    Ready,
    /// The store gave up on the file.
    Failed,
}

impl AssetStatus {
    /// Reconstruct the status from a stored asset.
    pub fn of(asset: &StoredAsset) -> Self {
        match (asset.processing, &asset.url) {
            (ProcessingState::Failed, _) => AssetStatus::Failed,
            (_, Some(_)) => AssetStatus::Ready,
            (ProcessingState::Pending, None) => AssetStatus::Uploading,
            _ => AssetStatus::Processing,
        }
    }
}

/// A published, retrievable asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// Assigned by the content store.
    pub id: AssetId,
    /// The name of the stored file.
    pub file_name: String,
    /// The MIME type of the stored file.
    pub content_type: String,
    /// The absolute `https://` address of the file.
    pub url: String,
    /// Always [AssetStatus::Ready] for assets returned by [AssetStore::upload].
    pub status: AssetStatus,
}

/// Why an upload did not produce a retrievable asset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    /// Processing did not finish within the polling budget.
    #[error("asset {0} was not processed in time")]
    ProcessingTimeout(AssetId),

    /// The content store reported that processing failed.
    #[error("asset {0} could not be processed")]
    ProcessingFailed(AssetId),

    /// A call to the content store failed.
    #[error("could not upload the asset: {0}")]
    Store(#[from] ContentStoreError),
}

/// How long to wait for asset processing.
///
/// The default polls once per second, ten times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// The pause between two status checks.
    pub interval: Duration,
    /// The number of status checks before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

/// Uploads files to the content store as assets.
#[derive(Clone)]
pub struct AssetStore {
    store: Arc<dyn ContentStore>,
    poll_policy: PollPolicy,
}

impl AssetStore {
    /// Create an asset store that polls according to `poll_policy`.
    pub fn new(store: Arc<dyn ContentStore>, poll_policy: PollPolicy) -> Self {
        Self { store, poll_policy }
    }

    /// Upload `bytes` as a new asset, wait for processing, then publish it.
    ///
    /// The returned asset is always published and has an absolute URL.
    ///
    /// # Errors
    /// Returns an [UploadError::ProcessingTimeout] if the asset is not ready after
    /// the configured number of polls, an [UploadError::ProcessingFailed] if the
    /// store gives up on the file, or an [UploadError::Store] if any call fails.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<Asset, UploadError> {
        let byte_count = bytes.len();
        let upload_id = self.store.create_upload(bytes).await?;
        let asset = self
            .store
            .create_asset(NewAsset {
                title: file_name.to_owned(),
                file_name: file_name.to_owned(),
                content_type: content_type.to_owned(),
                upload_id,
            })
            .await?;
        tracing::debug!(
            "created asset {} for '{file_name}' ({byte_count} bytes)",
            asset.id
        );

        self.store.process_asset(&asset.id).await?;
        self.wait_until_ready(&asset.id).await?;

        let published = self.store.publish_asset(&asset.id).await?;

        Ok(into_asset(published))
    }

    /// Fetch an asset and resolve its URL.
    ///
    /// Returns `None` for the URL if the asset has not finished processing.
    ///
    /// # Errors
    /// Returns an error if the content store call fails.
    pub async fn lookup_url(&self, id: &AssetId) -> Result<Option<String>, ContentStoreError> {
        let asset = self.store.get_asset(id).await?;

        Ok(asset.url.as_deref().map(resolve_url))
    }

    async fn wait_until_ready(&self, id: &AssetId) -> Result<(), UploadError> {
        for attempt in 1..=self.poll_policy.max_attempts {
            let asset = self.store.get_asset(id).await?;

            match AssetStatus::of(&asset) {
                AssetStatus::Ready => return Ok(()),
                AssetStatus::Failed => {
                    tracing::error!("asset {id} failed processing");
                    return Err(UploadError::ProcessingFailed(id.clone()));
                }
                AssetStatus::Uploading | AssetStatus::Processing => {
                    tracing::debug!(
                        "asset {id} still processing (attempt {attempt}/{})",
                        self.poll_policy.max_attempts
                    );
                }
            }

            if attempt < self.poll_policy.max_attempts {
                tokio::time::sleep(self.poll_policy.interval).await;
            }
        }

        tracing::error!(
            "asset {id} was not processed after {} attempts",
            self.poll_policy.max_attempts
        );

        Err(UploadError::ProcessingTimeout(id.clone()))
    }
}

fn into_asset(asset: StoredAsset) -> Asset {
    let status = AssetStatus::of(&asset);
    let url = asset.url.as_deref().map(resolve_url).unwrap_or_default();

    Asset {
        id: asset.id,
        file_name: asset.file_name,
        content_type: asset.content_type,
        url,
        status,
    }
}

/// Turn a protocol-relative URL (`//host/path`) into an `https://` URL.
///
/// URLs that already have a scheme are returned unchanged.
pub fn resolve_url(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_owned(),
    }
}

/// Guess a MIME type from a file name's extension, defaulting to JPEG.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "image/jpeg",
    }
}
