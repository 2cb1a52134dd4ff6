//! Application state shared across all route handlers.
//!
//! AppState holds the injected collaborators and the table of live user
//! sessions, keyed by bearer token. It is passed to handlers via axum's
//! State extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use shahr_chat::seed::{demo_session, fresh_session};
use shahr_chat::{QueryClient, Session, SessionController, SessionHandle};
use shahr_core::{
    CredentialVerifier, DocumentCatalog, IdentityStore, Result, SavedIdentity, ShahrConfig,
    ShahrError, User,
};

/// A logged-in user and the controller owning their conversation session.
#[derive(Clone)]
pub struct UserSession {
    pub user: User,
    pub handle: SessionHandle,
    pub started_at: Instant,
}

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
/// Mutable state is protected by `Mutex`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ShahrConfig>,
    /// Login credential check.
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Persistence of the last login.
    pub identity: Arc<dyn IdentityStore>,
    /// Remote question-answering service shared by all sessions.
    pub client: Arc<dyn QueryClient>,
    /// Uploaded document list.
    pub catalog: Arc<DocumentCatalog>,
    /// Live sessions by bearer token.
    pub sessions: Arc<Mutex<HashMap<String, UserSession>>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(
        config: ShahrConfig,
        verifier: Arc<dyn CredentialVerifier>,
        identity: Arc<dyn IdentityStore>,
        client: Arc<dyn QueryClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            identity,
            client,
            catalog: Arc::new(DocumentCatalog::demo()),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Spawn a session controller for `user` and register it under `token`.
    ///
    /// At `chat.max_sessions` the oldest session is evicted first, so
    /// abandoned logins do not pin controllers forever.
    /// Must be called from within a tokio runtime.
    pub fn start_session(&self, token: &str, user: User) -> Result<UserSession> {
        let handle = SessionController::spawn(
            self.new_chat_session(),
            Arc::clone(&self.client),
            Duration::from_secs(self.config.query.timeout_secs),
        );
        let session = UserSession {
            user,
            handle,
            started_at: Instant::now(),
        };

        let mut sessions = self.lock_sessions()?;
        if !sessions.contains_key(token) {
            while sessions.len() >= self.config.chat.max_sessions {
                let Some(oldest) = sessions
                    .iter()
                    .min_by_key(|(_, s)| s.started_at)
                    .map(|(t, _)| t.clone())
                else {
                    break;
                };
                if let Some(evicted) = sessions.remove(&oldest) {
                    warn!(user = %evicted.user.name, "Session limit reached; evicted oldest session");
                }
            }
        }
        sessions.insert(token.to_string(), session.clone());
        info!(user = %session.user.name, "Session started");
        Ok(session)
    }

    /// Drop the session registered under `token`. The controller stops
    /// once the last handle is gone.
    pub fn end_session(&self, token: &str) -> Result<Option<UserSession>> {
        let mut sessions = self.lock_sessions()?;
        let removed = sessions.remove(token);
        if let Some(session) = &removed {
            info!(user = %session.user.name, "Session ended");
        }
        Ok(removed)
    }

    pub fn session(&self, token: &str) -> Result<Option<UserSession>> {
        let sessions = self.lock_sessions()?;
        Ok(sessions.get(token).cloned())
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().map(|s| s.len()).unwrap_or(0)
    }

    /// Bring back the last saved login as a live session under the same
    /// token.
    pub fn restore_identity(&self) -> Result<Option<SavedIdentity>> {
        let Some(saved) = self.identity.restore()? else {
            return Ok(None);
        };
        self.start_session(&saved.token, saved.user.clone())?;
        info!(user = %saved.user.name, "Restored saved identity");
        Ok(Some(saved))
    }

    fn new_chat_session(&self) -> Session {
        let max = self.config.chat.summary_max_chars;
        if !self.config.chat.seed_demo_conversations {
            return fresh_session(max);
        }
        match demo_session(max) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to seed demo conversations; starting fresh");
                fresh_session(max)
            }
        }
    }

    fn lock_sessions(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, UserSession>>> {
        self.sessions
            .lock()
            .map_err(|e| ShahrError::Api(format!("Lock poisoned: {}", e)))
    }
}
