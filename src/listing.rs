//! Read-only access to the rental property listings.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use serde::Serialize;

use crate::{
    AppState, Error,
    content_store::{ContentStore, EntryId, Fields, PROPERTY_CONTENT_TYPE},
    identity::CallerId,
    role::{AccessGuard, Action},
};

/// The state needed to list properties.
#[derive(Clone)]
pub struct ListingState {
    /// The store holding the property entries.
    pub content_store: Arc<dyn ContentStore>,
    /// Checks that the caller may read listings.
    pub guard: AccessGuard,
}

impl FromRef<AppState> for ListingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            content_store: state.content_store.clone(),
            guard: AccessGuard::from_ref(state),
        }
    }
}

/// A published rental property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    /// The ID of the property entry.
    pub id: EntryId,
    /// The property's fields, links kept as link objects.
    pub fields: Fields,
}

/// A route handler that responds with every published property.
pub async fn list_properties_endpoint(
    State(state): State<ListingState>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<Vec<Listing>>, Error> {
    state.guard.authorize(&caller, Action::ReadListings).await?;

    let listings = state
        .content_store
        .find_entries(PROPERTY_CONTENT_TYPE, None)
        .await?
        .into_iter()
        .filter(|entry| entry.published)
        .map(|entry| Listing {
            id: entry.id,
            fields: entry.fields,
        })
        .collect();

    Ok(Json(listings))
}
