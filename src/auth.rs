use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Session,
};

/// Cookie carrying the access token between the login proxy and protected pages.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Audience the auth service stamps on user tokens.
pub const TOKEN_AUDIENCE: &str = "authenticated";

/// Claims
///
/// The subset of the auth service's JWT payload this server relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID, used as `user_id` on models.
    pub sub: Uuid,
    /// Expiration Time (exp). Always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Audience (aud): must be "authenticated".
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// AuthUser
///
/// The resolved identity of a request to a protected endpoint.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// The verified token, absent when the local bypass was used.
    pub access_token: Option<String>,
}

/// AuthUser Extractor Implementation
///
/// 1. Local Bypass: in `Env::Local`, a UUID in the `x-user-id` header is accepted.
/// 2. Token Extraction: `Authorization: Bearer <jwt>`, else the session cookie.
/// 3. Token Validation: HS256 with the project's JWT secret, audience and expiry checked.
///
/// Rejection: `AppError::AuthRequired`, which renders as a redirect to the login view.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id_str| Uuid::parse_str(id_str).ok());
            if let Some(id) = bypass {
                return Ok(AuthUser {
                    id,
                    email: None,
                    access_token: None,
                });
            }
        }

        let token = bearer_token(&parts.headers)
            .or_else(|| session_cookie(&CookieJar::from_headers(&parts.headers)))
            .ok_or(AppError::AuthRequired)?;

        let claims = verify_token(&token, &config.jwt_secret).map_err(|e| {
            tracing::debug!("rejected session token: {}", e);
            AppError::AuthRequired
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            access_token: Some(token),
        })
    }
}

/// Decodes and validates a user token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[TOKEN_AUDIENCE]);

    decode::<Claims>(token, &decoding_key, &validation).map(|data| data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// The access token stored in the session cookie. A cleared (empty) cookie is no session.
pub fn session_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value storing `session`'s access token.
pub fn session_cookie_header(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.access_token,
        session.expires_in.max(0)
    )
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_session_cookie_header() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
