use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    sync::{
        broadcast::{Receiver, error::RecvError},
        watch,
    },
    task::JoinHandle,
    time::{error::Elapsed, timeout},
};

use super::AuthClient;
use crate::{
    error::{AuthError, LOGIN_PATH},
    models::{AuthChangeEvent, AuthStateChange, Session},
};

/// GuardState
///
/// The phase of one mounted guard. `Unauthenticated` is terminal for the instance;
/// a fresh mount starts over in `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Navigator
///
/// Where the guard sends the caller when access is denied. Redirecting twice to the
/// same target must be harmless.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &str);
}

#[derive(Debug, Clone)]
pub struct GuardOptions {
    pub login_path: String,
    /// Bound on the initial session fetch. Expiry counts as "no session".
    pub initial_fetch_timeout: Duration,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_string(),
            initial_fetch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Default)]
struct Shared {
    history: Mutex<Vec<GuardState>>,
    session: Mutex<Option<Session>>,
}

/// SessionGuard
///
/// Gates a protected view. Mounting subscribes to auth-state notifications before the
/// current session is requested, so a sign-in or sign-out that lands while the fetch
/// is in flight is not lost. A single task owns the state machine; dropping or
/// tearing down the guard aborts it and releases the subscription.
pub struct SessionGuard {
    state: watch::Receiver<GuardState>,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl SessionGuard {
    pub fn mount(
        auth: Arc<dyn AuthClient>,
        navigator: Arc<dyn Navigator>,
        options: GuardOptions,
    ) -> Self {
        let events = auth.subscribe();
        let (state_tx, state_rx) = watch::channel(GuardState::Initializing);
        let shared = Arc::new(Shared::default());
        shared
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(GuardState::Initializing);

        let machine = Machine {
            auth,
            navigator,
            options,
            events,
            state: state_tx,
            shared: shared.clone(),
        };
        let task = tokio::spawn(machine.run());

        Self {
            state: state_rx,
            shared,
            task,
        }
    }

    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    /// The session the guard currently holds, if authenticated.
    pub fn session(&self) -> Option<Session> {
        self.shared
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> Vec<GuardState> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Waits until the guard has left `Initializing`.
    pub async fn settled(&mut self) -> GuardState {
        let reached = self
            .state
            .wait_for(|s| *s != GuardState::Initializing)
            .await
            .map(|s| *s);
        reached.unwrap_or_else(|_| self.state())
    }

    /// Waits until the guard reaches `target`, or its task ends.
    pub async fn wait_for(&mut self, target: GuardState) -> GuardState {
        let reached = self.state.wait_for(|s| *s == target).await.map(|s| *s);
        reached.unwrap_or_else(|_| self.state())
    }

    /// Unregisters the subscription. The guard acts on nothing afterwards.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Machine {
    auth: Arc<dyn AuthClient>,
    navigator: Arc<dyn Navigator>,
    options: GuardOptions,
    events: Receiver<AuthStateChange>,
    state: watch::Sender<GuardState>,
    shared: Arc<Shared>,
}

type FetchResult = Result<Result<Option<Session>, AuthError>, Elapsed>;

fn fetched_session(result: FetchResult) -> Option<Session> {
    match result {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => {
            tracing::warn!("session check failed: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!("session check timed out");
            None
        }
    }
}

impl Machine {
    async fn run(mut self) {
        match self.initial_session().await {
            Some(session) => self.enter_authenticated(session),
            None => return self.enter_unauthenticated(),
        }

        loop {
            match self.events.recv().await {
                Ok(change) => match change.event {
                    AuthChangeEvent::SignedOut => return self.enter_unauthenticated(),
                    AuthChangeEvent::SignedIn | AuthChangeEvent::TokenRefreshed => {
                        if let Some(session) = change.session {
                            self.store_session(Some(session));
                        }
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "guard missed auth notifications, re-checking");
                    match self.auth.get_session().await {
                        Ok(Some(session)) => self.store_session(Some(session)),
                        _ => return self.enter_unauthenticated(),
                    }
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("auth client closed, guard stopping");
                    return;
                }
            }
        }
    }

    /// Races the initial fetch against the notification stream; first answer wins.
    async fn initial_session(&mut self) -> Option<Session> {
        let auth = self.auth.clone();
        let fetch = timeout(self.options.initial_fetch_timeout, async move {
            auth.get_session().await
        });
        tokio::pin!(fetch);
        let mut notifications_open = true;

        loop {
            tokio::select! {
                biased;
                result = &mut fetch => return fetched_session(result),
                change = self.events.recv(), if notifications_open => match change {
                    Ok(AuthStateChange { event: AuthChangeEvent::SignedOut, .. }) => return None,
                    Ok(AuthStateChange { session: Some(session), .. }) => return Some(session),
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => notifications_open = false,
                },
            }
        }
    }

    fn store_session(&self, session: Option<Session>) {
        *self
            .shared
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn transition(&self, next: GuardState) {
        tracing::debug!(?next, "guard transition");
        self.shared
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(next);
        self.state.send_replace(next);
    }

    fn enter_authenticated(&self, session: Session) {
        tracing::info!(user_id = %session.user.id, "guard authenticated");
        self.store_session(Some(session));
        self.transition(GuardState::Authenticated);
    }

    fn enter_unauthenticated(&self) {
        self.store_session(None);
        self.transition(GuardState::Unauthenticated);
        tracing::info!(redirect_to = %self.options.login_path, "guard redirecting");
        self.navigator.redirect(&self.options.login_path);
    }
}
