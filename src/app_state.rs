//! Implements a struct that holds the state of the REST server.

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    asset::PollPolicy,
    coercion::verify_coverage,
    content_store::ContentStore,
    maintenance::MAINTENANCE_FIELDS,
    role::{DEFAULT_ROLE_CACHE_TTL, RoleCache, USER_ROLE_FIELDS},
    timezone::get_local_offset,
    transaction::TRANSACTION_FIELDS,
};

/// The settings that are not secrets.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Where anonymous callers are sent to sign in.
    pub sign_in_url: String,
    /// The header the identity proxy puts the signed-in user's ID in.
    ///
    /// Sign-in is switched off when this is `None`.
    pub identity_header: Option<String>,
    /// Printed at the top of reports.
    pub company_name: String,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How long a looked-up role is trusted.
    pub role_cache_ttl: Duration,
    /// How long to wait for receipt images to be processed.
    pub poll_policy: PollPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sign_in_url: "/sign-in".to_owned(),
            identity_header: None,
            company_name: "LUPA Ventures Inc.".to_owned(),
            local_timezone: "Etc/UTC".to_owned(),
            role_cache_ttl: DEFAULT_ROLE_CACHE_TTL,
            poll_policy: PollPolicy::default(),
        }
    }
}

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// Where transactions, receipts, roles and listings are stored.
    pub content_store: Arc<dyn ContentStore>,
    /// How long to wait for receipt images to be processed.
    pub poll_policy: PollPolicy,
    /// Caller roles, shared by all requests.
    pub role_cache: Arc<RoleCache>,
    /// Where anonymous callers are sent to sign in.
    pub sign_in_url: String,
    /// The header the identity proxy puts the signed-in user's ID in.
    pub identity_header: Option<String>,
    /// Printed at the top of reports.
    pub company_name: String,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] over `content_store`.
    ///
    /// # Errors
    /// Returns [Error::IncompleteCoercionTable] if a field written by the application
    /// has no coercion, or [Error::InvalidTimezoneError] if the configured timezone is
    /// unknown.
    pub fn new(
        content_store: Arc<dyn ContentStore>,
        cookie_secret: &str,
        config: AppConfig,
    ) -> Result<Self, Error> {
        verify_coverage(&[TRANSACTION_FIELDS, USER_ROLE_FIELDS, MAINTENANCE_FIELDS])
            .map_err(Error::IncompleteCoercionTable)?;

        if get_local_offset(&config.local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(config.local_timezone));
        }

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            content_store,
            poll_policy: config.poll_policy,
            role_cache: Arc::new(RoleCache::new(config.role_cache_ttl)),
            sign_in_url: config.sign_in_url,
            identity_header: config
                .identity_header
                .map(|header| header.to_ascii_lowercase()),
            company_name: config.company_name,
            local_timezone: config.local_timezone,
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
