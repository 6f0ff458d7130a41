#![allow(missing_docs)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use rusqlite::Connection;
use serde_json::Value;

use crate::{
    AppConfig, AppState, PollPolicy, Role, assign_role, build_router,
    content_store::{
        AssetFile, AssetId, ContentStore, ContentStoreError, Entry, EntryId, Fields, NewAsset,
        MAINTENANCE_CONTENT_TYPE, ProcessingState, SqliteContentStore, StoredAsset,
        TRANSACTION_CONTENT_TYPE, UploadId,
    },
    endpoints::{self, format_endpoint},
    identity::{COOKIE_SESSION, CallerId, DEFAULT_SESSION_DURATION, set_session_cookie},
    role::UserRoleEntry,
};

const TEST_ASSET_HOST: &str = "localhost:3000";
const TEST_COOKIE_SECRET: &str = "nafstenoas";
const TEST_SIGN_IN_ROUTE: &str = "/test/sign_in/{caller_id}";

pub(crate) fn get_test_content_store() -> SqliteContentStore {
    SqliteContentStore::new(Connection::open_in_memory().unwrap(), TEST_ASSET_HOST).unwrap()
}

/// A content store that can be told to misbehave and counts the calls made to it.
pub(crate) struct FaultyContentStore {
    inner: SqliteContentStore,
    never_finish_processing: bool,
    fail_processing: bool,
    fail_transaction_writes: AtomicBool,
    fail_transaction_publishing: bool,
    fail_maintenance_writes: bool,
    fail_unpublishing: bool,
    asset_reads_broken: AtomicBool,
    asset_polls: AtomicUsize,
    uploads: AtomicUsize,
}

impl Default for FaultyContentStore {
    fn default() -> Self {
        Self {
            inner: get_test_content_store(),
            never_finish_processing: false,
            fail_processing: false,
            fail_transaction_writes: AtomicBool::new(false),
            fail_transaction_publishing: false,
            fail_maintenance_writes: false,
            fail_unpublishing: false,
            asset_reads_broken: AtomicBool::new(false),
            asset_polls: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }
}

impl FaultyContentStore {
    /// Processing requests are accepted but assets never get a URL.
    pub(crate) fn never_finish_processing(mut self) -> Self {
        self.never_finish_processing = true;
        self
    }

    /// Assets report failed processing once processing was requested.
    pub(crate) fn fail_processing(mut self) -> Self {
        self.fail_processing = true;
        self
    }

    /// Creating or updating transaction entries fails.
    pub(crate) fn fail_transaction_writes(self) -> Self {
        self.break_transaction_writes();
        self
    }

    /// From now on, creating or updating transaction entries fails.
    pub(crate) fn break_transaction_writes(&self) {
        self.fail_transaction_writes.store(true, Ordering::SeqCst);
    }

    /// Publishing transaction entries fails.
    pub(crate) fn fail_transaction_publishing(mut self) -> Self {
        self.fail_transaction_publishing = true;
        self
    }

    /// Creating or updating maintenance requests fails.
    pub(crate) fn fail_maintenance_writes(mut self) -> Self {
        self.fail_maintenance_writes = true;
        self
    }

    /// Unpublishing any entry fails with a store outage.
    pub(crate) fn fail_unpublishing(mut self) -> Self {
        self.fail_unpublishing = true;
        self
    }

    /// From now on, fetching an asset fails.
    pub(crate) fn break_asset_reads(&self) {
        self.asset_reads_broken.store(true, Ordering::SeqCst);
    }

    /// The number of times an asset was fetched.
    pub(crate) fn asset_polls(&self) -> usize {
        self.asset_polls.load(Ordering::SeqCst)
    }

    /// The number of raw uploads created.
    pub(crate) fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn check_write(&self, content_type: &str) -> Result<(), ContentStoreError> {
        if self.fail_transaction_writes.load(Ordering::SeqCst) && content_type == TRANSACTION_CONTENT_TYPE {
            return Err(ContentStoreError::Unavailable(
                "transaction writes are switched off".to_owned(),
            ));
        }

        if self.fail_maintenance_writes && content_type == MAINTENANCE_CONTENT_TYPE {
            return Err(ContentStoreError::Unavailable(
                "maintenance request writes are switched off".to_owned(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl ContentStore for FaultyContentStore {
    async fn create_upload(&self, bytes: Vec<u8>) -> Result<UploadId, ContentStoreError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.create_upload(bytes).await
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<StoredAsset, ContentStoreError> {
        self.inner.create_asset(asset).await
    }

    async fn process_asset(&self, id: &AssetId) -> Result<(), ContentStoreError> {
        if self.never_finish_processing || self.fail_processing {
            // Check the asset exists so that unknown IDs still error.
            self.inner.get_asset(id).await?;
            return Ok(());
        }

        self.inner.process_asset(id).await
    }

    async fn get_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError> {
        self.asset_polls.fetch_add(1, Ordering::SeqCst);
        if self.asset_reads_broken.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Unavailable(
                "asset reads are switched off".to_owned(),
            ));
        }
        let asset = self.inner.get_asset(id).await?;

        if self.fail_processing {
            return Ok(StoredAsset {
                processing: ProcessingState::Failed,
                ..asset
            });
        }

        Ok(asset)
    }

    async fn publish_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError> {
        self.inner.publish_asset(id).await
    }

    async fn get_asset_file(&self, id: &AssetId) -> Result<AssetFile, ContentStoreError> {
        self.inner.get_asset_file(id).await
    }

    async fn create_entry(
        &self,
        content_type: &str,
        fields: Fields,
    ) -> Result<Entry, ContentStoreError> {
        self.check_write(content_type)?;
        self.inner.create_entry(content_type, fields).await
    }

    async fn get_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        self.inner.get_entry(id).await
    }

    async fn find_entries(
        &self,
        content_type: &str,
        field_equals: Option<(&str, &str)>,
    ) -> Result<Vec<Entry>, ContentStoreError> {
        self.inner.find_entries(content_type, field_equals).await
    }

    async fn update_entry(
        &self,
        id: &EntryId,
        fields: Fields,
    ) -> Result<Entry, ContentStoreError> {
        let existing = self.inner.get_entry(id).await?;
        self.check_write(&existing.content_type)?;
        self.inner.update_entry(id, fields).await
    }

    async fn publish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        let existing = self.inner.get_entry(id).await?;
        if self.fail_transaction_publishing && existing.content_type == TRANSACTION_CONTENT_TYPE
        {
            return Err(ContentStoreError::Unavailable(
                "transaction publishing is switched off".to_owned(),
            ));
        }

        self.inner.publish_entry(id).await
    }

    async fn unpublish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        if self.fail_unpublishing {
            return Err(ContentStoreError::Unavailable(
                "unpublishing is switched off".to_owned(),
            ));
        }

        self.inner.unpublish_entry(id).await
    }

    async fn delete_entry(&self, id: &EntryId) -> Result<(), ContentStoreError> {
        self.inner.delete_entry(id).await
    }
}

/// The full application behind a test server, with a stub sign-in route.
pub(crate) struct TestApp {
    pub(crate) server: TestServer,
    pub(crate) store: Arc<FaultyContentStore>,
}

impl TestApp {
    pub(crate) fn new() -> Self {
        Self::with_store(FaultyContentStore::default())
    }

    pub(crate) fn with_store(store: FaultyContentStore) -> Self {
        let store = Arc::new(store);
        let config = AppConfig {
            poll_policy: PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 10,
            },
            ..Default::default()
        };
        let state = AppState::new(store.clone(), TEST_COOKIE_SECRET, config)
            .expect("Could not create app state.");

        let sign_in_routes = Router::new()
            .route(TEST_SIGN_IN_ROUTE, post(stub_sign_in_route))
            .with_state(state.clone());
        let app = build_router(state).merge(sign_in_routes);

        let server = TestServer::new(app);

        Self { server, store }
    }

    /// Get a session cookie for `caller_id` without touching their role.
    pub(crate) async fn sign_in(&self, caller_id: &str) -> Cookie<'static> {
        let response = self
            .server
            .post(&format_endpoint(TEST_SIGN_IN_ROUTE, caller_id))
            .await;
        response.assert_status_ok();

        response.cookie(COOKIE_SESSION)
    }

    /// Give `caller_id` a role and get a session cookie for them.
    pub(crate) async fn sign_in_as(&self, caller_id: &str, role: Role) -> Cookie<'static> {
        self.assign_role(caller_id, role).await;
        self.sign_in(caller_id).await
    }

    pub(crate) async fn assign_role(&self, user_id: &str, role: Role) -> UserRoleEntry {
        assign_role(self.store.as_ref(), user_id, role)
            .await
            .expect("Could not assign role.")
    }

    /// Submit the "TX-1" rent receipt and return the new record's ID.
    pub(crate) async fn create_transaction(&self, cookie: &Cookie<'static>) -> EntryId {
        let form = MultipartForm::new()
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
            );

        let response = self
            .server
            .post(endpoints::TRANSACTIONS)
            .add_cookie(cookie.clone())
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);

        let body = response.json::<Value>();
        EntryId::new(
            body["entryId"]
                .as_str()
                .expect("response should contain the entry ID"),
        )
    }
}

async fn stub_sign_in_route(
    State(state): State<AppState>,
    Path(caller_id): Path<String>,
) -> PrivateCookieJar {
    set_session_cookie(
        PrivateCookieJar::new(state.cookie_key),
        &CallerId::new(caller_id),
        DEFAULT_SESSION_DURATION,
    )
}
