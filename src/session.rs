//! Per-visitor session state.
//!
//! Each browser gets a session id in the `session` cookie. The session holds
//! at most one uploaded table; uploading replaces it, a failed upload or an
//! explicit reset drops it, and idle sessions expire.

use crate::table::Table;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";

/// What a session currently holds.
#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    NoFileLoaded,
    FileLoaded {
        filename: String,
        table: Arc<Table>,
    },
}

#[derive(Clone, Debug)]
pub struct Session {
    pub state: SessionState,

    /// Time when the session expires unless touched again
    pub expires_at: SystemTime,
}

/// All live sessions, keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates an empty session and returns its id.
    pub fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            state: SessionState::NoFileLoaded,
            expires_at: SystemTime::now() + self.ttl,
        };
        self.write().insert(session_id.clone(), session);
        session_id
    }

    /// Whether the id names a live session.
    pub fn is_valid(&self, session_id: &str) -> bool {
        self.read()
            .get(session_id)
            .is_some_and(|s| s.expires_at > SystemTime::now())
    }

    /// Current state of a live session, extending its lifetime.
    pub fn state(&self, session_id: &str) -> Option<SessionState> {
        let mut sessions = self.write();
        let session = sessions.get_mut(session_id)?;
        if session.expires_at <= SystemTime::now() {
            return None;
        }
        session.expires_at = SystemTime::now() + self.ttl;
        Some(session.state.clone())
    }

    /// The loaded table, if any.
    pub fn table(&self, session_id: &str) -> Option<Arc<Table>> {
        match self.state(session_id)? {
            SessionState::FileLoaded { table, .. } => Some(table),
            SessionState::NoFileLoaded => None,
        }
    }

    /// Stores a freshly parsed table, replacing any previous one.
    pub fn load(&self, session_id: &str, filename: &str, table: Table) -> Arc<Table> {
        let table = Arc::new(table);
        self.set(
            session_id,
            SessionState::FileLoaded {
                filename: filename.to_string(),
                table: table.clone(),
            },
        );
        table
    }

    /// Drops the current table. Used both for a failed upload and for an
    /// explicit reset.
    pub fn clear(&self, session_id: &str) {
        self.set(session_id, SessionState::NoFileLoaded);
    }

    /// Removes every expired session and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&self, session_id: &str, state: SessionState) {
        let expires_at = SystemTime::now() + self.ttl;
        self.write()
            .insert(session_id.to_string(), Session { state, expires_at });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
