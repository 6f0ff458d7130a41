//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    asset::get_asset_file_endpoint,
    endpoints,
    identity::{get_sign_in_callback, get_sign_out, require_caller},
    listing::list_properties_endpoint,
    maintenance::submit_maintenance_request_endpoint,
    role::{
        get_user_role_endpoint, identity_webhook_endpoint, list_user_roles_endpoint,
        update_user_role_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        export_transactions_endpoint, get_transaction_endpoint, list_transactions_endpoint,
    },
};

/// The largest request body accepted, which bounds the size of receipt images.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::SIGN_IN_CALLBACK, get(get_sign_in_callback))
        .route(endpoints::SIGN_OUT, get(get_sign_out))
        .route(endpoints::IDENTITY_WEBHOOK, post(identity_webhook_endpoint))
        .route(endpoints::ASSET_FILE, get(get_asset_file_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_CSV,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(endpoints::USER_ROLE, get(get_user_role_endpoint))
        .route(endpoints::USER_ROLE_ENTRY, put(update_user_role_endpoint))
        .route(endpoints::USER_ROLES, get(list_user_roles_endpoint))
        .route(endpoints::PROPERTIES, get(list_properties_endpoint))
        .route(
            endpoints::MAINTENANCE_REQUESTS,
            post(submit_maintenance_request_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_caller));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found." })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        AppConfig, AppState, build_router, endpoints,
        identity::COOKIE_SESSION,
        test_utils::{TestApp, get_test_content_store},
    };

    const IDENTITY_HEADER: &str = "x-authenticated-user";

    fn get_production_server() -> TestServer {
        let config = AppConfig {
            identity_header: Some(IDENTITY_HEADER.to_owned()),
            ..Default::default()
        };
        let state = AppState::new(Arc::new(get_test_content_store()), "nafstenoas", config)
            .expect("Could not create app state.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn identity_proxy_sign_in_opens_protected_routes() {
        let server = get_production_server();

        let sign_in = server
            .get(endpoints::SIGN_IN_CALLBACK)
            .add_query_param("redirect_url", endpoints::PROPERTIES)
            .add_header(IDENTITY_HEADER, "user_2abc")
            .await;
        sign_in.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(sign_in.header("location"), endpoints::PROPERTIES);

        let response = server
            .get(endpoints::PROPERTIES)
            .add_cookie(sign_in.cookie(COOKIE_SESSION))
            .await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn sign_in_without_identity_header_is_unauthorized() {
        let server = get_production_server();

        let response = server.get(endpoints::SIGN_IN_CALLBACK).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.maybe_cookie(COOKIE_SESSION).is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = TestApp::new();

        let response = app.server.get("/api/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({ "error": "Not found." }));
    }

    #[tokio::test]
    async fn sign_out_redirects_to_sign_in() {
        let app = TestApp::new();
        let cookie = app.sign_in("user_a").await;

        let response = app.server.get(endpoints::SIGN_OUT).add_cookie(cookie).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/sign-in");
    }

    #[tokio::test]
    async fn protected_routes_redirect_anonymous_callers() {
        let app = TestApp::new();

        for path in [
            endpoints::TRANSACTIONS,
            endpoints::TRANSACTIONS_CSV,
            endpoints::USER_ROLE,
            endpoints::USER_ROLES,
            endpoints::PROPERTIES,
        ] {
            let response = app.server.get(path).await;

            response.assert_status(StatusCode::SEE_OTHER);
            let location = response.header("location");
            assert!(
                location.to_str().unwrap().starts_with("/sign-in?redirect_url="),
                "{path} redirected to {location:?}"
            );
        }
    }
}
