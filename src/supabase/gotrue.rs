use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, Response};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use uuid::Uuid;

use super::SupabaseClient;
use crate::{
    error::AuthError,
    models::{Session, SessionUser},
};

/// AuthApi
///
/// The stateless operations of the remote auth service. Session bookkeeping and
/// change notifications live one level up, in `session::SupabaseAuthClient`.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Resolves the user behind `access_token`, verified by the auth service.
    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// AuthApiState
///
/// The shared handle to the auth service used across the application state.
pub type AuthApiState = Arc<dyn AuthApi>;

// --- The Real Implementation (GoTrue over HTTP) ---

/// GoTrueApi
///
/// Talks to `{SUPABASE_URL}/auth/v1`.
#[derive(Clone)]
pub struct GoTrueApi {
    client: SupabaseClient,
}

impl GoTrueApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }

        let mut session = response
            .json::<Session>()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if session.expires_at == 0 {
            session.expires_at = Utc::now().timestamp() + session.expires_in;
        }
        Ok(session)
    }
}

/// The error bodies GoTrue produces vary by version; take whichever message is present.
#[derive(Deserialize, Default)]
struct GoTrueErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

async fn decode_error(response: Response) -> AuthError {
    let status = response.status();
    let body = response
        .json::<GoTrueErrorBody>()
        .await
        .unwrap_or_default();
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| format!("HTTP {}", status));

    if status.is_client_error() {
        AuthError::Rejected(message)
    } else {
        AuthError::Transport(message)
    }
}

#[async_trait]
impl AuthApi for GoTrueApi {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError> {
        let response = self
            .client
            .auth(Method::GET, "user", Some(access_token))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }
        response
            .json::<SessionUser>()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .auth(Method::POST, "logout", Some(access_token))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }
        Ok(())
    }
}

// --- The Mock Implementation (For Tests) ---

struct MockAccount {
    email: String,
    password: String,
    user: SessionUser,
}

/// MockAuthApi
///
/// An in-process stand-in for the auth service. Accounts are registered up front;
/// issued access and refresh tokens are tracked so `get_user`, `refresh_session` and
/// `sign_out` behave like the real service.
pub struct MockAuthApi {
    accounts: Vec<MockAccount>,
    access_tokens: Mutex<HashMap<String, SessionUser>>,
    refresh_tokens: Mutex<HashMap<String, SessionUser>>,
    counter: AtomicU64,
    /// Lifetime of issued sessions.
    pub session_ttl_secs: i64,
    /// When true, every call fails as if the service were unreachable.
    pub unavailable: bool,
}

impl Default for MockAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            access_tokens: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            session_ttl_secs: 3600,
            unavailable: false,
        }
    }

    pub fn with_account(mut self, email: &str, password: &str, id: Uuid) -> Self {
        self.accounts.push(MockAccount {
            email: email.to_string(),
            password: password.to_string(),
            user: SessionUser {
                id,
                email: Some(email.to_string()),
            },
        });
        self
    }

    /// Number of access tokens currently valid.
    pub fn live_sessions(&self) -> usize {
        self.access_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn check_available(&self) -> Result<(), AuthError> {
        if self.unavailable {
            return Err(AuthError::Transport(
                "Mock auth error: service unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn issue(&self, user: SessionUser) -> Session {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("mock-access-{}-{}", user.id.simple(), n);
        let refresh_token = format!("mock-refresh-{}-{}", user.id.simple(), n);

        self.access_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(access_token.clone(), user.clone());
        self.refresh_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(refresh_token.clone(), user.clone());

        Session {
            access_token,
            refresh_token,
            expires_in: self.session_ttl_secs,
            expires_at: Utc::now().timestamp() + self.session_ttl_secs,
            user,
        }
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.check_available()?;
        let account = self
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .ok_or_else(|| AuthError::Rejected("Invalid login credentials".to_string()))?;
        Ok(self.issue(account.user.clone()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.check_available()?;
        // Refresh tokens are single use.
        let user = self
            .refresh_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(refresh_token)
            .ok_or_else(|| AuthError::Rejected("Invalid Refresh Token".to_string()))?;
        Ok(self.issue(user))
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AuthError> {
        self.check_available()?;
        self.access_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(access_token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected("invalid JWT".to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.check_available()?;
        self.access_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(access_token);
        Ok(())
    }
}
