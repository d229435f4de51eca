use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any visitor may call. Enquiries are anonymous by nature; the access check answers
/// for whoever is viewing, including nobody.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe.
        .route("/health", get(|| async { "ok" }))
        // POST /enquiries?blogId=...&blogTitle=...
        // JSON enquiry from a content page. Delivered to the API and the relay.
        .route("/enquiries", post(handlers::submit_enquiry))
        // POST /enquiries/form
        // The same, as a url-encoded form post for pages without scripting.
        .route("/enquiries/form", post(handlers::submit_enquiry_form))
        // GET /access/check?permission=...&roles=a,b&requireAll=...
        // Tells the site shell whether to render a gated block or its fallback.
        .route("/access/check", get(handlers::check_access))
}
