//! Decides whether a caller may perform an action.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{AppState, Error, content_store::ContentStore, identity::CallerId};

use super::{Role, RoleCache, find_user_role};

/// Something a caller may ask to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, edit or delete a transaction.
    MutateTransactions,
    /// Read transactions and export reports.
    ViewTransactions,
    /// Change a user's role.
    MutateRoles,
    /// List the roles of all users.
    ViewRoles,
    /// Browse rental listings.
    ReadListings,
    /// File a maintenance request.
    SubmitMaintenance,
}

impl Action {
    fn allows(&self, role: Role) -> bool {
        match self {
            Action::MutateTransactions
            | Action::ViewTransactions
            | Action::MutateRoles
            | Action::ViewRoles => role == Role::Admin,
            Action::ReadListings | Action::SubmitMaintenance => true,
        }
    }
}

/// Resolves callers to roles and checks them against actions.
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn ContentStore>,
    cache: Arc<RoleCache>,
}

impl AccessGuard {
    /// Create a guard that looks roles up in `store` and caches them in `cache`.
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<RoleCache>) -> Self {
        Self { store, cache }
    }

    /// The role of `caller`.
    ///
    /// A caller without a role entry, or with an unknown stored role, is a
    /// [Role::Member].
    ///
    /// # Errors
    /// Returns an error if the role lookup fails.
    pub async fn role_of(&self, caller: &CallerId) -> Result<Role, Error> {
        Ok(self.stored_role(caller).await?.unwrap_or(Role::Member))
    }

    /// The role stored for `user`, `None` if they have no entry or an unknown role.
    ///
    /// # Errors
    /// Returns an error if the role lookup fails.
    pub async fn stored_role(&self, user: &CallerId) -> Result<Option<Role>, Error> {
        if let Some(role) = self.cache.get(user) {
            return Ok(role);
        }

        let ticket = self.cache.start_lookup();
        let role = find_user_role(self.store.as_ref(), user.as_str())
            .await?
            .and_then(|entry| entry.role);
        self.cache.insert(user.clone(), role, ticket);

        Ok(role)
    }

    /// Check that `caller` may perform `action`.
    ///
    /// # Errors
    /// Returns [Error::Forbidden] if the caller's role does not allow the action, or
    /// an error if the role lookup fails.
    pub async fn authorize(&self, caller: &CallerId, action: Action) -> Result<Role, Error> {
        let role = self.role_of(caller).await?;

        if action.allows(role) {
            Ok(role)
        } else {
            tracing::info!("denied {action:?} to {caller} with role {role}");
            Err(Error::Forbidden)
        }
    }
}

impl FromRef<AppState> for AccessGuard {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.content_store.clone(), state.role_cache.clone())
    }
}
