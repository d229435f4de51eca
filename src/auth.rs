use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::{ContextProvider, ProviderChain, StorageProvider, primary_role},
    config::{AppConfig, Env},
    models::{CurrentUser, RoleClaim},
};

/// Claims
///
/// Payload of the bearer tokens issued by the site's auth provider. Role information travels in
/// the token, so no lookup is needed to build the auth context.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// A single role or a list of roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleClaim>,
    /// Expiration Time (exp). Always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            id: Some(claims.sub.to_string()),
            email: claims.email,
            role: claims.role,
            ..CurrentUser::default()
        }
    }
}

/// AuthUser Extractor Result
///
/// The verified auth context of a request: the user record plus its derived primary role.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: CurrentUser,
    pub role: String,
}

impl AuthUser {
    fn new(user: CurrentUser) -> Self {
        let role = primary_role(&user);
        Self { user, role }
    }
}

// Header pair accepted in `Env::Local` in place of a token.
const LOCAL_EMAIL_HEADER: &str = "x-user-email";
const LOCAL_ROLE_HEADER: &str = "x-user-role";

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, an `x-user-role` header (with optional `x-user-email`)
///    stands in for a token.
/// 2. Token extraction: `Authorization: Bearer <jwt>`.
/// 3. Token validation against the configured secret, expiry included.
///
/// Rejection: `StatusCode::UNAUTHORIZED` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user) = local_bypass_user(parts) {
                return Ok(AuthUser::new(user));
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired bearer token"),
                other => tracing::debug!(error = ?other, "rejected invalid bearer token"),
            }
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser::new(token_data.claims.into()))
    }
}

fn local_bypass_user(parts: &Parts) -> Option<CurrentUser> {
    let read = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let role = read(LOCAL_ROLE_HEADER)?;
    Some(CurrentUser {
        email: read(LOCAL_EMAIL_HEADER),
        role: Some(RoleClaim::One(role)),
        ..CurrentUser::default()
    })
}

/// Viewer
///
/// The current user for gating purposes, or `None`. Tries the auth context first, then the user
/// record the client persisted in its `user` / `currentUser` cookies. Never rejects.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = AuthUser::from_request_parts(parts, state)
            .await
            .ok()
            .map(|auth| auth.user);

        let chain = ProviderChain::new()
            .with(ContextProvider::new(context))
            .with(StorageProvider::new(CookieJar::from_headers(&parts.headers)));

        Ok(Viewer(chain.resolve()))
    }
}
