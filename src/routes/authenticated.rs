use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Every handler here relies on the `AuthUser` middleware on the layer above.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's profile, primary role and granted permissions.
        .route("/me", get(handlers::get_me))
}
