use std::time::Duration;
use tokio::{
    sync::broadcast::{Receiver, error::RecvError},
    time::timeout,
};

use super::AuthClient;
use crate::{
    error::AuthError,
    models::{AuthChangeEvent, AuthStateChange, Session},
};

/// await_session
///
/// Waits for a confirmed session: whichever comes first of the current-session fetch
/// returning one, or a SignedIn / TokenRefreshed notification carrying one. Fails with
/// `SessionTimeout` once `limit` has passed; a fetch error is returned as is.
pub async fn await_session(auth: &dyn AuthClient, limit: Duration) -> Result<Session, AuthError> {
    // Subscribe before fetching so a notification in between is not missed.
    let mut events = auth.subscribe();

    within(limit, wait_for_session(auth, &mut events)).await
}

async fn within(
    limit: Duration,
    wait: impl Future<Output = Result<Session, AuthError>>,
) -> Result<Session, AuthError> {
    match timeout(limit, wait).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?limit, "no session confirmed in time");
            Err(AuthError::SessionTimeout(limit))
        }
    }
}

async fn wait_for_session(
    auth: &dyn AuthClient,
    events: &mut Receiver<AuthStateChange>,
) -> Result<Session, AuthError> {
    if let Some(session) = auth.get_session().await? {
        return Ok(session);
    }

    loop {
        match events.recv().await {
            Ok(change) => match (change.event, change.session) {
                (AuthChangeEvent::SignedIn | AuthChangeEvent::TokenRefreshed, Some(session)) => {
                    return Ok(session);
                }
                _ => continue,
            },
            Err(RecvError::Lagged(_)) => {
                if let Some(session) = auth.get_session().await? {
                    return Ok(session);
                }
            }
            // Nothing more can arrive; let the deadline decide.
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

/// sign_in_and_wait
///
/// Signs in with email and password, then waits for the session to be confirmed the
/// same way `await_session` does. The subscription is taken before signing in, and
/// `limit` bounds the sign-in and the wait together.
pub async fn sign_in_and_wait(
    auth: &dyn AuthClient,
    email: &str,
    password: &str,
    limit: Duration,
) -> Result<Session, AuthError> {
    let mut events = auth.subscribe();

    tracing::info!("signing in");
    within(limit, sign_in_then_wait(auth, email, password, &mut events)).await
}

async fn sign_in_then_wait(
    auth: &dyn AuthClient,
    email: &str,
    password: &str,
    events: &mut Receiver<AuthStateChange>,
) -> Result<Session, AuthError> {
    auth.sign_in_with_password(email, password).await?;
    wait_for_session(auth, events).await
}
