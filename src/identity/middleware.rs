//! Middleware that resolves the caller from the session cookie.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::AppState;

use super::cookie::get_caller_from_cookies;

/// The state needed to resolve callers.
#[derive(Clone)]
pub struct IdentityState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// Where anonymous callers are sent to sign in.
    pub sign_in_url: String,
    /// The header the identity proxy puts the signed-in user's ID in.
    pub identity_header: Option<String>,
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            sign_in_url: state.sign_in_url.clone(),
            identity_header: state.identity_header.clone(),
        }
    }
}

impl FromRef<IdentityState> for Key {
    fn from_ref(state: &IdentityState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The caller ID is placed into the request and the request executed normally if the
/// cookie is valid, otherwise the client is redirected to the sign-in page with the
/// original path in the `redirect_url` query parameter.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(caller): Extension<CallerId>` to receive the caller ID.
pub async fn require_caller(
    State(state): State<IdentityState>,
    request: Request,
    next: Next,
) -> Response {
    let sign_in_redirect = build_sign_in_redirect_url(&state.sign_in_url, request.uri());

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to sign in page.");
            return Redirect::to(&sign_in_redirect).into_response();
        }
    };

    let Some(caller_id) = get_caller_from_cookies(&jar) else {
        return Redirect::to(&sign_in_redirect).into_response();
    };

    parts.extensions.insert(caller_id);
    next.run(Request::from_parts(parts, body)).await
}

fn build_sign_in_redirect_url(sign_in_url: &str, uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .unwrap_or("/");

    match serde_urlencoded::to_string([("redirect_url", target)]) {
        Ok(param) => format!("{sign_in_url}?{param}"),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {target}: {error}");
            sign_in_url.to_owned()
        }
    }
}
