/// Router Module Index
///
/// Routes are grouped by who may call them, so access control is applied per module.

/// Routes open to any client: health, enquiry submission and gate checks.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes whose handlers additionally require the `manage_users` permission.
pub mod admin;
