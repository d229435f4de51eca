use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use lead_portal::{
    AppConfig, AppState, MockSink,
    access::primary_role,
    auth::{AuthUser, Claims, Viewer},
    config::Env,
    enquiry::{EnquirySubmitter, SinkState},
    models::RoleClaim,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(role: RoleClaim, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: TEST_USER_ID,
        email: Some("test@example.com".to_string()),
        role: Some(role),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        submitter: EnquirySubmitter::new(
            Arc::new(MockSink::new("api")) as SinkState,
            Arc::new(MockSink::new("relay")) as SinkState,
        ),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(RoleClaim::One("editor".to_string()), 3600));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .expect("valid token");

    assert_eq!(user.role, "editor");
    assert_eq!(user.user.id, Some(TEST_USER_ID.to_string()));
    assert_eq!(user.user.email.as_deref(), Some("test@example.com"));
}

#[tokio::test]
async fn test_multi_role_token_uses_primary_role() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let roles = RoleClaim::Many(vec!["user".to_string(), "admin".to_string()]);
    bearer(&mut parts, &create_token(roles, 3600));

    let user = AuthUser::from_request_parts(&mut parts, &app_state).await.unwrap();

    assert_eq!(user.role, "admin");
    assert_eq!(primary_role(&user.user), user.role);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Well past the default 60s leeway.
    bearer(&mut parts, &create_token(RoleClaim::One("admin".to_string()), -3600));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let mut app_state = create_app_state(Env::Production);
    app_state.config.jwt_secret = "another-secret".to_string();
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(RoleClaim::One("admin".to_string()), 3600));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let app_state = create_app_state(Env::Local);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-role"),
        header::HeaderValue::from_static("Admin"),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-user-email"),
        header::HeaderValue::from_static("local@dev.com"),
    );

    let user = AuthUser::from_request_parts(&mut parts, &app_state).await.unwrap();

    assert_eq!(user.role, "Admin");
    assert_eq!(user.user.email.as_deref(), Some("local@dev.com"));
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-role"),
        header::HeaderValue::from_static("admin"),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- Viewer resolution ---

#[tokio::test]
async fn test_viewer_prefers_token_over_cookie() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    bearer(&mut parts, &create_token(RoleClaim::One("author".to_string()), 3600));
    let cookie = format!("user={}", urlencoding::encode(r#"{"role":"admin"}"#));
    parts
        .headers
        .insert(header::COOKIE, header::HeaderValue::from_str(&cookie).unwrap());

    let Ok(Viewer(user)) = Viewer::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(primary_role(&user.unwrap()), "author");
}

#[tokio::test]
async fn test_viewer_falls_back_to_cookie() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let cookie = format!(
        "user={}; currentUser={}",
        urlencoding::encode("{oops"),
        urlencoding::encode(r#"{"email":"ed@example.com","role":"editor"}"#)
    );
    parts
        .headers
        .insert(header::COOKIE, header::HeaderValue::from_str(&cookie).unwrap());

    let Ok(Viewer(user)) = Viewer::from_request_parts(&mut parts, &app_state).await;

    let user = user.expect("currentUser cookie parses");
    assert_eq!(user.email.as_deref(), Some("ed@example.com"));
    assert_eq!(primary_role(&user), "editor");
}

#[tokio::test]
async fn test_viewer_without_any_source_is_none() {
    let app_state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let Ok(Viewer(user)) = Viewer::from_request_parts(&mut parts, &app_state).await;

    assert!(user.is_none());
}
