//! Maintenance requests that tenants file about their rental, optionally with a
//! photo of the problem.

mod request;
mod submit_endpoint;

pub use request::{MAINTENANCE_FIELDS, MaintenanceService, MaintenanceSubmission};
pub use submit_endpoint::submit_maintenance_request_endpoint;
