use axum::{
    Form, Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    access::{RoleGate, permission_table, permissions::permission, permissions_for},
    auth::{AuthUser, Viewer},
    error::AppError,
    models::{
        AccessDecision, AccessQuery, EnquiryAccepted, EnquiryRejected, EnquiryRequest, PageRef,
        RolePermissions, UserProfile,
    },
};

// --- Enquiries ---

/// submit_enquiry
///
/// [Public Route] Validates a lead enquiry and delivers it to the first-party API and the relay.
/// The page may be named in the query string or in the body; the body wins.
#[utoipa::path(
    post,
    path = "/enquiries",
    params(PageRef),
    request_body = EnquiryRequest,
    responses(
        (status = 200, description = "Enquiry sent", body = EnquiryAccepted),
        (status = 422, description = "Invalid form", body = EnquiryRejected),
        (status = 502, description = "Delivery failed", body = EnquiryRejected)
    )
)]
pub async fn submit_enquiry(
    State(state): State<AppState>,
    Query(page): Query<PageRef>,
    Json(payload): Json<EnquiryRequest>,
) -> Result<Json<EnquiryAccepted>, AppError> {
    handle_enquiry(&state, page, payload).await
}

/// submit_enquiry_form
///
/// [Public Route] Same as `submit_enquiry` for a plain url-encoded form post.
#[utoipa::path(
    post,
    path = "/enquiries/form",
    params(PageRef),
    request_body(content = EnquiryRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Enquiry sent", body = EnquiryAccepted),
        (status = 422, description = "Invalid form", body = EnquiryRejected),
        (status = 502, description = "Delivery failed", body = EnquiryRejected)
    )
)]
pub async fn submit_enquiry_form(
    State(state): State<AppState>,
    Query(page): Query<PageRef>,
    Form(payload): Form<EnquiryRequest>,
) -> Result<Json<EnquiryAccepted>, AppError> {
    handle_enquiry(&state, page, payload).await
}

async fn handle_enquiry(
    state: &AppState,
    page: PageRef,
    payload: EnquiryRequest,
) -> Result<Json<EnquiryAccepted>, AppError> {
    let page = PageRef {
        blog_id: payload.blog_id.unwrap_or(page.blog_id),
        blog_title: payload.blog_title.unwrap_or(page.blog_title),
    };

    let report = state.submitter.submit(&payload.form, &page).await?;

    Ok(Json(EnquiryAccepted {
        status: "sent".to_string(),
        api_delivered: report.api_delivered(),
        relay_delivered: report.relay_delivered(),
    }))
}

// --- Access ---

/// check_access
///
/// [Public Route] Evaluates a role gate for whoever is viewing. The viewer is taken from the
/// bearer token when there is one, otherwise from the `user` / `currentUser` cookies.
#[utoipa::path(
    get,
    path = "/access/check",
    params(AccessQuery),
    responses((status = 200, description = "Gate decision", body = AccessDecision))
)]
pub async fn check_access(
    Viewer(user): Viewer,
    Query(query): Query<AccessQuery>,
) -> Json<AccessDecision> {
    let mut gate = RoleGate::new().require_all(query.require_all);
    if let Some(permission) = query.permission.filter(|p| !p.trim().is_empty()) {
        gate = gate.permission(permission);
    }
    if let Some(roles) = query.roles {
        gate = gate.roles(
            roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty()),
        );
    }

    Json(gate.check(user.as_ref()).into())
}

/// get_me
///
/// [Authenticated Route] The caller's identity, primary role and what that role may do.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(AuthUser { user, role }: AuthUser) -> Json<UserProfile> {
    Json(UserProfile {
        id: user.id,
        email: user.email,
        permissions: permissions_for(&role).iter().map(|p| p.to_string()).collect(),
        primary_role: role,
    })
}

/// get_permissions
///
/// [Admin Route] The full role/permission table.
///
/// *Authorization*: the caller's primary role must grant `manage_users`.
#[utoipa::path(
    get,
    path = "/admin/permissions",
    responses(
        (status = 200, description = "Permission table", body = [RolePermissions]),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn get_permissions(
    AuthUser { user, .. }: AuthUser,
) -> Result<Json<Vec<RolePermissions>>, AppError> {
    let gate = RoleGate::new().permission(permission::MANAGE_USERS);
    if !gate.check(Some(&user)).is_visible() {
        return Err(AppError::Forbidden);
    }
    Ok(Json(permission_table()))
}
