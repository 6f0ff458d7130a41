//! Changes the role of a user.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    content_store::{ContentStore, EntryId},
    identity::CallerId,
};

use super::{AccessGuard, Action, Role, RoleCache, set_role};

/// The state needed to change a role.
#[derive(Clone)]
pub struct UpdateUserRoleState {
    /// The store holding the user-role entries.
    pub content_store: Arc<dyn ContentStore>,
    /// Invalidated for the user whose role changed.
    pub role_cache: Arc<RoleCache>,
    /// Checks that the caller is an admin.
    pub guard: AccessGuard,
}

impl FromRef<AppState> for UpdateUserRoleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            content_store: state.content_store.clone(),
            role_cache: state.role_cache.clone(),
            guard: AccessGuard::from_ref(state),
        }
    }
}

/// The request body for changing a role.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleBody {
    /// One of `admin`, `member` or `tenant`.
    pub role: String,
}

/// A route handler that sets the role on the user-role entry in the path.
///
/// Only admins may change roles, including their own.
pub async fn update_user_role_endpoint(
    State(state): State<UpdateUserRoleState>,
    Extension(caller): Extension<CallerId>,
    Path(entry_id): Path<String>,
    Json(body): Json<UpdateUserRoleBody>,
) -> Result<Response, Error> {
    state.guard.authorize(&caller, Action::MutateRoles).await?;
    let role: Role = body.role.parse()?;

    let entry = set_role(state.content_store.as_ref(), &EntryId::new(entry_id), role).await?;
    state.role_cache.invalidate(&entry.user_id);
    tracing::info!("{caller} set the role of {} to {role}", entry.user_id);

    Ok(Json(json!({ "updated": true })).into_response())
}
