//! Client-side session handling: the process-wide auth client, the session guard
//! that gates protected views, and the post-login session sync.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::{
    error::AuthError,
    models::{AuthChangeEvent, AuthStateChange, Session, SessionUser},
    supabase::AuthApi,
};

pub mod guard;
pub mod sync;

pub use guard::{GuardOptions, GuardState, Navigator, SessionGuard};
pub use sync::{await_session, sign_in_and_wait};

/// Sessions expiring within this many seconds are refreshed on read.
pub const REFRESH_MARGIN_SECS: i64 = 60;

const EVENT_CAPACITY: usize = 16;

/// AuthClient
///
/// The stateful auth client shared by every guard in the process. It holds the current
/// session and broadcasts auth-state notifications; dropping the receiver returned by
/// `subscribe` unregisters it.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// The current session, refreshed first when it is about to expire.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// The current user as verified by the auth service.
    async fn get_user(&self) -> Result<Option<SessionUser>, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn refresh_session(&self) -> Result<Session, AuthError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// SupabaseAuthClient
///
/// `AuthClient` over any `AuthApi`. Constructed once and passed to whatever needs it.
pub struct SupabaseAuthClient {
    api: Arc<dyn AuthApi>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl SupabaseAuthClient {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            session: RwLock::new(None),
            events,
        }
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        tracing::debug!(?event, "auth state change");
        // No receivers is fine.
        let _ = self.events.send(AuthStateChange { event, session });
    }

    async fn clear_and_sign_out_locally(&self) {
        self.session.write().await.take();
        self.emit(AuthChangeEvent::SignedOut, None);
    }
}

#[async_trait]
impl AuthClient for SupabaseAuthClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.expires_within(Utc::now().timestamp(), REFRESH_MARGIN_SECS) {
            return Ok(Some(session));
        }

        tracing::debug!("session close to expiry, refreshing");
        match self.refresh_session().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::Rejected(msg)) => {
                tracing::warn!("refresh rejected, dropping session: {}", msg);
                self.clear_and_sign_out_locally().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self) -> Result<Option<SessionUser>, AuthError> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };
        match self.api.get_user(&session.access_token).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::Rejected(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = self.api.sign_in_with_password(email, password).await?;
        *self.session.write().await = Some(session.clone());
        tracing::info!(user_id = %session.user.id, "signed in");
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// sign_out
    ///
    /// Revokes the session remotely when there is one, then always clears it locally
    /// and notifies subscribers.
    async fn sign_out(&self) -> Result<(), AuthError> {
        let current = self.session.write().await.take();
        if let Some(session) = current {
            if let Err(e) = self.api.sign_out(&session.access_token).await {
                tracing::warn!("remote sign out failed: {}", e);
            }
        }
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::AuthRequired)?;

        let session = self.api.refresh_session(&refresh_token).await?;
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}
