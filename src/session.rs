//! The single process-wide authentication state.
//!
//! `SessionStore` is the only writer of the credential token. State changes are
//! published on a `watch` channel so views (navigation bar, admin pages) can
//! follow them without polling.

use crate::app_server::AppServerApi;
use crate::error::{ApplicationServerError, AuthError, RequestFailure};
use crate::models::{Credentials, Identity, Profile};
use crate::token_store::TokenStore;
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub profile: Profile,
    token: String,
}

impl Session {
    pub(crate) fn bearer(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("profile", &self.profile)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Before `restore_session` has run.
    Unknown,
    Restoring,
    Authenticated(Arc<Session>),
    Anonymous,
}

impl SessionState {
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session().map(|s| &s.identity)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.session().map(|s| &s.profile)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}

pub struct SessionStore {
    server: Arc<dyn AppServerApi>,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    ops: Mutex<()>,
}

impl SessionStore {
    pub fn new(server: Arc<dyn AppServerApi>, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            server,
            tokens,
            state,
            ops: Mutex::new(()),
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn require_admin(&self) -> Result<Arc<Session>, AuthError> {
        match self.current() {
            SessionState::Authenticated(s) if s.identity.is_admin => Ok(s),
            SessionState::Authenticated(_) => Err(AuthError::Forbidden),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Never fails: any problem with the stored token ends in `Anonymous` with
    /// the token removed.
    pub async fn restore_session(&self) -> SessionState {
        let _guard = self.ops.lock().await;
        self.state.send_replace(SessionState::Restoring);

        let token = match self.tokens.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No stored session token");
                return self.publish(SessionState::Anonymous);
            }
            Err(e) => {
                warn!("Failed to read stored session token: {}", e);
                self.discard_token().await;
                return self.publish(SessionState::Anonymous);
            }
        };

        match self.establish(token).await {
            Ok(session) => {
                info!(username = %session.identity.username, "Session restored");
                self.publish(SessionState::Authenticated(Arc::new(session)))
            }
            Err(e) => {
                warn!("Session restore failed, continuing anonymously: {}", e);
                self.discard_token().await;
                self.publish(SessionState::Anonymous)
            }
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Arc<Session>, AuthError> {
        let _guard = self.ops.lock().await;
        self.sign_in_locked(credentials).await
    }

    /// Registration only acknowledges; the session comes from a follow-up sign-in
    /// with the same credentials.
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<Arc<Session>, AuthError> {
        let _guard = self.ops.lock().await;
        let ack = self
            .server
            .register(credentials)
            .await
            .map_err(registration_failure)?;
        if !ack.is_created() {
            warn!(status = %ack.status, "Unexpected registration acknowledgment");
            return Err(AuthError::Rejected(format!(
                "unexpected registration status '{}'",
                ack.status
            )));
        }
        info!(username = %credentials.username, "Account registered");
        self.sign_in_locked(credentials).await
    }

    /// Local state is cleared even when the server call or storage fails; only a
    /// storage failure is reported.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _guard = self.ops.lock().await;
        let token = self.current().session().map(|s| s.token.clone());

        if let Some(token) = token {
            if let Err(e) = self.server.sign_out(&token).await {
                warn!("Server sign-out failed, clearing local session anyway: {}", e);
            }
        }

        let cleared = self.tokens.clear().await;
        self.publish(SessionState::Anonymous);
        info!("Signed out");
        cleared.map_err(AuthError::from)
    }

    async fn sign_in_locked(&self, credentials: &Credentials) -> Result<Arc<Session>, AuthError> {
        let grant = self
            .server
            .sign_in(credentials)
            .await
            .map_err(sign_in_failure)?;
        let profile = self.server.profile(&grant.user.id, &grant.token).await?;
        self.tokens.save(&grant.token).await?;

        let session = Arc::new(Session {
            identity: grant.user,
            profile,
            token: grant.token,
        });
        info!(username = %session.identity.username, admin = session.identity.is_admin, "Signed in");
        self.publish(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    async fn establish(&self, token: String) -> Result<Session, ApplicationServerError> {
        let identity = self.server.session(&token).await?;
        let profile = self.server.profile(&identity.id, &token).await?;
        Ok(Session {
            identity,
            profile,
            token,
        })
    }

    async fn discard_token(&self) {
        if let Err(e) = self.tokens.clear().await {
            error!("Failed to remove stored session token: {}", e);
        }
    }

    fn publish(&self, state: SessionState) -> SessionState {
        self.state.send_replace(state.clone());
        state
    }
}

fn sign_in_failure(e: ApplicationServerError) -> AuthError {
    match e.status() {
        Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            AuthError::InvalidCredentials
        }
        _ => AuthError::Server(e),
    }
}

fn registration_failure(e: ApplicationServerError) -> AuthError {
    match &e.failure {
        RequestFailure::Status { status, body } if status.is_client_error() => {
            AuthError::Rejected(if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            })
        }
        _ => AuthError::Server(e),
    }
}
