//! Receipt images: uploading them to the content store and serving them back.

mod serve_endpoint;
mod store;

pub use serve_endpoint::get_asset_file_endpoint;
pub use store::{
    Asset, AssetStatus, AssetStore, PollPolicy, UploadError, guess_content_type, resolve_url,
};
