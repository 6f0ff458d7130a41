//! Who is calling: resolving the caller from the identity provider's session cookie.
//!
//! The identity provider owns sign-in. It signs users in as an authenticating proxy
//! and hands them to the sign-in callback, which starts a session. This module then
//! reads the opaque caller ID from the encrypted session cookie, redirects anonymous
//! callers to sign-in and offers sign-out.

mod cookie;
mod middleware;
mod sign_in;
mod sign_out;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use cookie::{DEFAULT_SESSION_DURATION, invalidate_session_cookie, set_session_cookie};
pub(crate) use middleware::IdentityState;
pub use middleware::require_caller;
pub use sign_in::get_sign_in_callback;
pub use sign_out::get_sign_out;

#[cfg(test)]
pub(crate) use cookie::COOKIE_SESSION;

/// The identifier the identity provider issued to the signed-in caller.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Wrap an identifier issued by the identity provider.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
