//! Sign-in callback that turns the identity proxy's verdict into a session cookie.
//!
//! The identity provider sits in front of the server as an authenticating proxy. Once
//! the provider has signed a user in, it forwards the user to the callback with their
//! ID in a header that only the proxy can set.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, Query};
use serde::Deserialize;

use crate::Error;

use super::{CallerId, DEFAULT_SESSION_DURATION, middleware::IdentityState, set_session_cookie};

/// The query string of the sign-in callback.
#[derive(Debug, Default, Deserialize)]
pub struct SignInCallback {
    /// Where to send the caller after signing in, must be a path on this server.
    pub redirect_url: Option<String>,
}

/// Start a session for the caller named by the identity header and redirect them.
///
/// # Errors
/// Returns [Error::NotSignedIn] if no identity header is configured or the request
/// does not carry one.
pub async fn get_sign_in_callback(
    State(state): State<IdentityState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    Query(query): Query<SignInCallback>,
) -> Result<Response, Error> {
    let Some(header_name) = state.identity_header.as_deref() else {
        tracing::warn!("sign-in callback was called but no identity header is configured");
        return Err(Error::NotSignedIn);
    };

    let caller_id = headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(Error::NotSignedIn)?;
    let caller_id = CallerId::new(caller_id);

    let target = local_redirect_target(query.redirect_url.as_deref());
    tracing::info!("{caller_id} signed in");

    let jar = set_session_cookie(jar, &caller_id, DEFAULT_SESSION_DURATION);

    Ok((jar, Redirect::to(target)).into_response())
}

/// Only paths on this server are followed, anything else goes to the root.
fn local_redirect_target(redirect_url: Option<&str>) -> &str {
    redirect_url
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .unwrap_or("/")
}
