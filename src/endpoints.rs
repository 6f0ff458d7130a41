//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use
//! [format_endpoint].

use std::fmt::Display;

/// The route the identity proxy sends signed-in users to.
pub const SIGN_IN_CALLBACK: &str = "/api/sign_in/callback";
/// The route for the client to sign out the current caller.
pub const SIGN_OUT: &str = "/api/sign_out";
/// The route the identity provider posts user events to.
pub const IDENTITY_WEBHOOK: &str = "/api/webhooks/identity";
/// The route to look up the role of a user by `userId`.
pub const USER_ROLE: &str = "/api/user-role";
/// The route to change the role on a user-role entry.
pub const USER_ROLE_ENTRY: &str = "/api/user-role/{entry_id}";
/// The route to list the roles of all users.
pub const USER_ROLES: &str = "/api/user-roles";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to read, edit and delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to download the transaction report.
pub const TRANSACTIONS_CSV: &str = "/api/transactions/export.csv";
/// The route to list rental properties.
pub const PROPERTIES: &str = "/api/properties";
/// The route to file a maintenance request.
pub const MAINTENANCE_REQUESTS: &str = "/api/maintenance-requests";
/// The route serving the bytes of published assets.
pub const ASSET_FILE: &str = "/assets/{asset_id}/{file_name}";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
