//! Serves the bytes of published assets so that stored URLs resolve.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{
    AppState, Error,
    content_store::{AssetId, ContentStore},
};

/// The state needed to serve asset files.
#[derive(Clone)]
pub struct AssetFileState {
    /// The store holding the asset bytes.
    pub content_store: Arc<dyn ContentStore>,
}

impl FromRef<AppState> for AssetFileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            content_store: state.content_store.clone(),
        }
    }
}

/// A route handler that responds with the bytes of a published asset.
///
/// The file name in the path is only there to make URLs readable, the asset ID
/// alone decides which file is served.
pub async fn get_asset_file_endpoint(
    State(state): State<AssetFileState>,
    Path((asset_id, _file_name)): Path<(String, String)>,
) -> Result<Response, Error> {
    let file = state
        .content_store
        .get_asset_file(&AssetId::new(asset_id))
        .await?;

    Ok((
        [
            (CONTENT_TYPE, file.content_type),
            (CACHE_CONTROL, "public, max-age=31536000, immutable".to_owned()),
        ],
        file.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;

    use crate::{
        asset::{AssetStore, PollPolicy, get_asset_file_endpoint, serve_endpoint::AssetFileState},
        content_store::ContentStore,
        endpoints,
        test_utils::get_test_content_store,
    };

    fn get_test_server(store: Arc<dyn ContentStore>) -> TestServer {
        let app = Router::new()
            .route(endpoints::ASSET_FILE, get(get_asset_file_endpoint))
            .with_state(AssetFileState {
                content_store: store,
            });

        TestServer::new(app)
    }

    async fn upload_and_get_path(store: Arc<dyn ContentStore>, file_name: &str) -> String {
        let asset = AssetStore::new(
            store,
            PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 3,
            },
        )
        .upload(b"jpeg bytes".to_vec(), file_name, "image/jpeg")
        .await
        .unwrap();

        asset
            .url
            .split_once("/assets/")
            .map(|(_, rest)| format!("/assets/{rest}"))
            .unwrap()
    }

    #[tokio::test]
    async fn serves_uploaded_receipt() {
        let store: Arc<dyn ContentStore> = Arc::new(get_test_content_store());
        let path = upload_and_get_path(store.clone(), "receipt.jpg").await;
        let server = get_test_server(store);

        let response = server.get(&path).await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/jpeg");
        assert_eq!(response.as_bytes().as_ref(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn awkward_file_names_still_resolve() {
        for file_name in ["scans/march/receipt.jpg", "", "rent receipt #3.jpg"] {
            let store: Arc<dyn ContentStore> = Arc::new(get_test_content_store());
            let path = upload_and_get_path(store.clone(), file_name).await;
            let server = get_test_server(store);

            let response = server.get(&path).await;

            response.assert_status_ok();
            assert_eq!(response.as_bytes().as_ref(), b"jpeg bytes", "{file_name:?}");
        }
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let server = get_test_server(Arc::new(get_test_content_store()));

        let response = server.get("/assets/missing/receipt.jpg").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
