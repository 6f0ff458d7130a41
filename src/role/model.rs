//! The role model and the queries over the user-role content type.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error, ValidationError,
    coercion::coerce,
    content_store::{
        ContentStore, ContentStoreError, Entry, EntryId, FieldValue, Fields,
        USER_ROLE_CONTENT_TYPE,
    },
};

/// The fields written for a user-role entry.
pub const USER_ROLE_FIELDS: &[&str] = &[
    "userId",
    "role",
    "userName",
    "email",
    "firstName",
    "lastName",
];

/// What a signed-in user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages transactions and the roles of other users.
    Admin,
    /// The default role for a new user.
    Member,
    /// Rents a property.
    Tenant,
}

impl Role {
    /// The lowercase name that is stored and shown to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Tenant => "tenant",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "tenant" => Ok(Role::Tenant),
            _ => Err(ValidationError::InvalidRole(s.to_owned())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user-role entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleEntry {
    /// The ID of the entry in the content store.
    pub id: EntryId,
    /// The identifier issued by the identity provider.
    pub user_id: String,
    /// `None` if the stored role is not a known role.
    pub role: Option<Role>,
    /// Mirrored from the identity provider.
    pub user_name: String,
    /// Mirrored from the identity provider.
    pub email: String,
    /// Mirrored from the identity provider.
    pub first_name: String,
    /// Mirrored from the identity provider.
    pub last_name: String,
}

impl UserRoleEntry {
    fn from_entry(entry: Entry) -> Self {
        let text = |name: &str| {
            entry
                .fields
                .get(name)
                .and_then(FieldValue::as_text)
                .unwrap_or_default()
                .to_owned()
        };

        let raw_role = text("role");
        let role = match raw_role.parse() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!("user-role entry {} has unknown role \"{raw_role}\"", entry.id);
                None
            }
        };

        Self {
            user_id: text("userId"),
            role,
            user_name: text("userName"),
            email: text("email"),
            first_name: text("firstName"),
            last_name: text("lastName"),
            id: entry.id,
        }
    }
}

/// The details of a user as reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    /// The identifier issued by the identity provider.
    pub user_id: String,
    /// The user's display name, may be empty.
    pub user_name: String,
    /// The user's primary email address, may be empty.
    pub email: String,
    /// May be empty.
    pub first_name: String,
    /// May be empty.
    pub last_name: String,
}

/// Find the role entry for `user_id`.
///
/// Returns `None` if the user has no entry.
///
/// # Errors
/// Returns an error if the content store call fails.
pub async fn find_user_role(
    store: &dyn ContentStore,
    user_id: &str,
) -> Result<Option<UserRoleEntry>, ContentStoreError> {
    let entries = store
        .find_entries(USER_ROLE_CONTENT_TYPE, Some(("userId", user_id)))
        .await?;

    if entries.len() > 1 {
        tracing::warn!(
            "found {} user-role entries for {user_id}, using the first",
            entries.len()
        );
    }

    Ok(entries.into_iter().next().map(UserRoleEntry::from_entry))
}

/// Get every user-role entry, ordered by user ID.
///
/// # Errors
/// Returns an error if the content store call fails.
pub async fn list_user_roles(
    store: &dyn ContentStore,
) -> Result<Vec<UserRoleEntry>, ContentStoreError> {
    let mut entries: Vec<UserRoleEntry> = store
        .find_entries(USER_ROLE_CONTENT_TYPE, None)
        .await?
        .into_iter()
        .map(UserRoleEntry::from_entry)
        .collect();

    entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    Ok(entries)
}

/// Create a published entry for `user` with `role`, unless the user already has one.
///
/// Returns the stored entry and whether it was created by this call.
///
/// # Errors
/// Returns an error if the content store call fails.
pub async fn create_user_role_if_absent(
    store: &dyn ContentStore,
    user: &NewUser,
    role: Role,
) -> Result<(UserRoleEntry, bool), Error> {
    if let Some(existing) = find_user_role(store, &user.user_id).await? {
        return Ok((existing, false));
    }

    let mut fields = Fields::new();
    for (name, value) in [
        ("userId", user.user_id.as_str()),
        ("role", role.as_str()),
        ("userName", user.user_name.as_str()),
        ("email", user.email.as_str()),
        ("firstName", user.first_name.as_str()),
        ("lastName", user.last_name.as_str()),
    ] {
        fields.insert(name.to_owned(), coerce(name, value)?);
    }

    let entry = store.create_entry(USER_ROLE_CONTENT_TYPE, fields).await?;
    let entry = store.publish_entry(&entry.id).await?;
    tracing::info!("created user-role entry {} for {}", entry.id, user.user_id);

    Ok((UserRoleEntry::from_entry(entry), true))
}

/// Set the role on the user-role entry `id` and publish the change.
///
/// # Errors
/// Returns [Error::NotFound] if `id` is not a user-role entry, or an error if a
/// content store call fails.
pub async fn set_role(
    store: &dyn ContentStore,
    id: &EntryId,
    role: Role,
) -> Result<UserRoleEntry, Error> {
    let entry = store.get_entry(id).await?;

    if entry.content_type != USER_ROLE_CONTENT_TYPE {
        return Err(Error::NotFound);
    }

    let mut fields = entry.fields;
    fields.insert("role".to_owned(), coerce("role", role.as_str())?);

    store.update_entry(id, fields).await?;
    let entry = store.publish_entry(id).await?;

    Ok(UserRoleEntry::from_entry(entry))
}

/// Give `user_id` the role `role`, creating their entry if needed.
///
/// # Errors
/// Returns an error if a content store call fails.
pub async fn assign_role(
    store: &dyn ContentStore,
    user_id: &str,
    role: Role,
) -> Result<UserRoleEntry, Error> {
    let user = NewUser {
        user_id: user_id.to_owned(),
        ..Default::default()
    };

    match create_user_role_if_absent(store, &user, role).await? {
        (entry, true) => Ok(entry),
        (entry, false) => set_role(store, &entry.id, role).await,
    }
}
