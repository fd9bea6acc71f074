//! Per-chat dialogue state

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreResult;

/// Identifies one conversation (a chat id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which answer the dialogue is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingEmail,
    AwaitingName,
    AwaitingPhone,
}

/// Answers collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedOwner {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// An in-progress token creation dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub id: SessionId,
    pub step: Step,
    pub collected: CollectedOwner,
    pub started_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn begin(id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            step: Step::AwaitingEmail,
            collected: CollectedOwner::default(),
            started_at,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.started_at > ttl
    }
}

/// Trait for dialogue session storage
pub trait SessionStore: Send + Sync {
    /// Get a session by id
    fn get(&self, id: &SessionId) -> StoreResult<Option<ConversationSession>>;

    /// Create or replace a session
    fn put(&self, session: ConversationSession) -> StoreResult<()>;

    /// Delete a session
    fn remove(&self, id: &SessionId) -> StoreResult<()>;

    /// Delete sessions started before `cutoff`, returning how many went
    fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &SessionId) -> StoreResult<Option<ConversationSession>> {
        Ok(self.sessions.read().unwrap().get(id).cloned())
    }

    fn put(&self, session: ConversationSession) -> StoreResult<()> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session);
        Ok(())
    }

    fn remove(&self, id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(id);
        Ok(())
    }

    fn cleanup_expired(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.started_at >= cutoff);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_lifecycle() {
        let store = InMemorySessionStore::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let session = ConversationSession::begin(SessionId::new("42"), now);

        store.put(session.clone()).unwrap();
        assert_eq!(store.get(&session.id).unwrap(), Some(session.clone()));

        store.remove(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = InMemorySessionStore::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        store
            .put(ConversationSession::begin(SessionId::new("old"), now - Duration::hours(2)))
            .unwrap();
        store
            .put(ConversationSession::begin(SessionId::new("new"), now))
            .unwrap();

        let removed = store.cleanup_expired(now - Duration::minutes(30)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&SessionId::new("new")).unwrap().is_some());
    }

    #[test]
    fn test_staleness() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let session = ConversationSession::begin(SessionId::new("1"), now);
        assert!(!session.is_stale(now + Duration::minutes(30), Duration::minutes(30)));
        assert!(session.is_stale(now + Duration::minutes(31), Duration::minutes(30)));
    }
}
