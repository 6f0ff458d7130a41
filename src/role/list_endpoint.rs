//! Lists the roles of all users.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};

use crate::{AppState, Error, content_store::ContentStore, identity::CallerId};

use super::{AccessGuard, Action, UserRoleEntry, list_user_roles};

/// The state needed to list roles.
#[derive(Clone)]
pub struct ListUserRolesState {
    /// The store holding the user-role entries.
    pub content_store: Arc<dyn ContentStore>,
    /// Checks that the caller is an admin.
    pub guard: AccessGuard,
}

impl FromRef<AppState> for ListUserRolesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            content_store: state.content_store.clone(),
            guard: AccessGuard::from_ref(state),
        }
    }
}

/// A route handler that responds with every user-role entry, ordered by user ID.
pub async fn list_user_roles_endpoint(
    State(state): State<ListUserRolesState>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<Vec<UserRoleEntry>>, Error> {
    state.guard.authorize(&caller, Action::ViewRoles).await?;

    let entries = list_user_roles(state.content_store.as_ref()).await?;

    Ok(Json(entries))
}
