//! User roles and the access rules built on them.
//!
//! Every signed-in user has at most one user-role entry in the content store. Users
//! without an entry are treated as members.

mod cache;
mod guard;
mod list_endpoint;
mod lookup_endpoint;
mod model;
mod update_endpoint;
mod webhook_endpoint;

pub use cache::{DEFAULT_ROLE_CACHE_TTL, RoleCache};
pub use guard::{AccessGuard, Action};
pub use list_endpoint::list_user_roles_endpoint;
pub use lookup_endpoint::get_user_role_endpoint;
pub use model::{
    NewUser, Role, USER_ROLE_FIELDS, UserRoleEntry, assign_role, create_user_role_if_absent,
    find_user_role, list_user_roles, set_role,
};
pub use update_endpoint::update_user_role_endpoint;
pub use webhook_endpoint::identity_webhook_endpoint;
