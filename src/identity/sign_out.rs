//! Sign-out route handler that invalidates the session cookie.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use super::{invalidate_session_cookie, middleware::IdentityState};

/// Invalidate the session cookie and redirect the client to the sign-in page.
pub async fn get_sign_out(State(state): State<IdentityState>, jar: PrivateCookieJar) -> Response {
    let jar = invalidate_session_cookie(jar);

    (jar, Redirect::to(&state.sign_in_url)).into_response()
}
