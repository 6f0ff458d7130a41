//! Looks up the role of a single user.

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, Error, identity::CallerId};

use super::AccessGuard;

/// The state needed to look up a role.
#[derive(Clone)]
pub struct UserRoleLookupState {
    /// Reads roles through the shared role cache.
    pub guard: AccessGuard,
}

impl FromRef<AppState> for UserRoleLookupState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            guard: AccessGuard::from_ref(state),
        }
    }
}

/// The query string for a role lookup.
#[derive(Debug, Deserialize)]
pub struct UserRoleQuery {
    /// The identity provider's ID of the user.
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// A route handler that responds with `{"role": ...}` for the user in the query
/// string, or `{"role": null}` if the user has no role entry.
pub async fn get_user_role_endpoint(
    State(state): State<UserRoleLookupState>,
    Query(query): Query<UserRoleQuery>,
) -> Result<Response, Error> {
    let Some(user_id) = query.user_id.filter(|id| !id.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing userId" })),
        )
            .into_response());
    };

    // An entry with an unknown role is reported the same as a missing entry.
    let role = state.guard.stored_role(&CallerId::new(user_id)).await?;

    Ok(Json(json!({ "role": role })).into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{Role, endpoints, test_utils::TestApp};

    #[tokio::test]
    async fn returns_role_of_user() {
        let app = TestApp::new();
        app.assign_role("user_a", Role::Tenant).await;
        let cookie = app.sign_in("user_b").await;

        let response = app
            .server
            .get(endpoints::USER_ROLE)
            .add_query_param("userId", "user_a")
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "role": "tenant" }));
    }

    #[tokio::test]
    async fn unknown_user_has_null_role() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_b").await;

        let response = app
            .server
            .get(endpoints::USER_ROLE)
            .add_query_param("userId", "nobody")
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "role": null }));
    }

    #[tokio::test]
    async fn role_change_through_endpoint_is_seen_by_lookup() {
        let app = TestApp::new();
        let entry = app.assign_role("user_a", Role::Tenant).await;
        let admin = app.sign_in_as("admin_1", Role::Admin).await;
        let lookup = || {
            app.server
                .get(endpoints::USER_ROLE)
                .add_query_param("userId", "user_a")
                .add_cookie(admin.clone())
        };
        lookup().await.assert_json(&json!({ "role": "tenant" }));

        app.server
            .put(&endpoints::format_endpoint(endpoints::USER_ROLE_ENTRY, entry.id.as_str()))
            .add_cookie(admin.clone())
            .json(&json!({ "role": "admin" }))
            .await
            .assert_status_ok();

        lookup().await.assert_json(&json!({ "role": "admin" }));
    }

    #[tokio::test]
    async fn missing_user_id_is_bad_request() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_b").await;

        let response = app
            .server
            .get(endpoints::USER_ROLE)
            .add_cookie(cookie)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Missing userId" }));
    }
}
