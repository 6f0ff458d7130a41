//! Reading and writing the encrypted session cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::CallerId;

pub(crate) const COOKIE_SESSION: &str = "session";
/// How long a session lasts when the identity provider does not say otherwise.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::days(7);

/// The contents of the session cookie.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SessionToken {
    caller_id: CallerId,
    /// Unix timestamp in seconds.
    expires_at: i64,
}

/// Add a session cookie for `caller_id` that expires after `duration`.
///
/// Returns the cookie jar with the cookie added.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    caller_id: &CallerId,
    duration: Duration,
) -> PrivateCookieJar {
    let expiry = OffsetDateTime::now_utc() + duration;
    let token = SessionToken {
        caller_id: caller_id.clone(),
        expires_at: expiry.unix_timestamp(),
    };
    // A struct of a string and an integer always serializes.
    let value = serde_json::to_string(&token).unwrap_or_default();

    jar.add(
        Cookie::build((COOKIE_SESSION, value))
            .expires(expiry)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero, which
/// should delete the cookie on the client side.
pub fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Get the caller from an unexpired session cookie, `None` for anonymous callers.
pub(crate) fn get_caller_from_cookies(jar: &PrivateCookieJar) -> Option<CallerId> {
    let cookie = jar.get(COOKIE_SESSION)?;
    let token: SessionToken = serde_json::from_str(cookie.value_trimmed()).ok()?;

    if token.expires_at <= OffsetDateTime::now_utc().unix_timestamp() {
        tracing::debug!("session for {} has expired", token.caller_id);
        return None;
    }

    Some(token.caller_id)
}
