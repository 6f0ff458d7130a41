//! Receives events from the identity provider.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, Error, content_store::ContentStore};

use super::{NewUser, Role, create_user_role_if_absent};

const USER_CREATED: &str = "user.created";

/// The state needed to handle identity provider events.
#[derive(Clone)]
pub struct IdentityWebhookState {
    /// The store holding the user-role entries.
    pub content_store: Arc<dyn ContentStore>,
}

impl FromRef<AppState> for IdentityWebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            content_store: state.content_store.clone(),
        }
    }
}

/// An event sent by the identity provider.
#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    /// The event name, e.g. `user.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The user the event is about.
    #[serde(default)]
    pub data: EventUser,
}

/// The user attached to an [IdentityEvent].
#[derive(Debug, Default, Deserialize)]
pub struct EventUser {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

impl From<EventUser> for NewUser {
    fn from(user: EventUser) -> Self {
        Self {
            email: user
                .email_addresses
                .into_iter()
                .next()
                .map(|address| address.email_address)
                .unwrap_or_default(),
            user_id: user.id,
            user_name: user.username.unwrap_or_default(),
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
        }
    }
}

/// A route handler that gives newly created users the member role.
///
/// Responds with `{"created": true}` for a new entry, `{"exists": true}` if the
/// user already has one and `{"ignored": true}` for other events.
pub async fn identity_webhook_endpoint(
    State(state): State<IdentityWebhookState>,
    Json(event): Json<IdentityEvent>,
) -> Result<Json<Value>, Error> {
    tracing::info!("identity event received: {}", event.event_type);

    if event.event_type != USER_CREATED {
        return Ok(Json(json!({ "ignored": true })));
    }

    let user = NewUser::from(event.data);
    if user.user_id.is_empty() {
        return Err(crate::ValidationError::MissingField("data.id").into());
    }

    let (_, created) =
        create_user_role_if_absent(state.content_store.as_ref(), &user, Role::Member).await?;

    if created {
        Ok(Json(json!({ "created": true })))
    } else {
        tracing::info!("user {} already has a role, skipping creation", user.user_id);
        Ok(Json(json!({ "exists": true })))
    }
}
