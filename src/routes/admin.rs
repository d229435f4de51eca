use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Handlers extract `AuthUser` themselves and gate on `manage_users`,
/// answering 401 without credentials and 403 without the permission.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/permissions
        // The role/permission table used by every gate.
        .route("/permissions", get(handlers::get_permissions))
}
