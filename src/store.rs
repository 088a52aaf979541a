//! Process-local session store
//!
//! Holds every live masking session keyed by an opaque handle. Entries are
//! guarded by `DashMap` per-key locks, so masking under one handle never
//! blocks work under another, while two `mask` calls against the same handle
//! are serialized.

use crate::session::Session;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a stored session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Session> for SessionHandle {
    fn from(session: &Session) -> Self {
        Self(session.id().to_string())
    }
}

/// Shared map of live sessions. Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session under its own id, replacing any previous entry.
    pub fn insert(&self, session: Session) -> SessionHandle {
        let handle = SessionHandle::from(&session);
        self.sessions.insert(handle.0.clone(), session);
        handle
    }

    /// Run a read-only closure against a session.
    ///
    /// Returns `None` if the handle is unknown.
    pub fn with<F, R>(&self, handle: &SessionHandle, f: F) -> Option<R>
    where
        F: FnOnce(&Session) -> R,
    {
        self.sessions.get(handle.as_str()).map(|s| f(s.value()))
    }

    /// Run a closure with exclusive access to a session.
    ///
    /// The entry stays locked for the duration of `f`; keep it synchronous.
    pub fn with_mut<F, R>(&self, handle: &SessionHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        self.sessions
            .get_mut(handle.as_str())
            .map(|mut s| f(s.value_mut()))
    }

    /// Snapshot of a session
    pub fn get(&self, handle: &SessionHandle) -> Option<Session> {
        self.with(handle, Session::clone)
    }

    pub fn contains(&self, handle: &SessionHandle) -> bool {
        self.sessions.contains_key(handle.as_str())
    }

    /// Discard a session and wipe its mapping. Returns whether it existed.
    pub fn remove(&self, handle: &SessionHandle) -> bool {
        match self.sessions.remove(handle.as_str()) {
            Some((_, mut session)) => {
                let mappings = session.len();
                session.clear();
                tracing::info!(
                    session_id = %handle,
                    mappings,
                    "Masking session discarded"
                );
                true
            }
            None => false,
        }
    }

    /// Remove a session and hand it to the caller
    pub fn take(&self, handle: &SessionHandle) -> Option<Session> {
        self.sessions.remove(handle.as_str()).map(|(_, s)| s)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Discard every session
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        tracing::info!(sessions = count, "Session store cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn populated() -> Session {
        let mut session = Session::new();
        session.allocate("Alice", &Category::Person);
        session
    }

    #[test]
    fn test_insert_and_read() {
        let store = SessionStore::new();
        let session = populated();
        let id = session.id().to_string();
        let handle = store.insert(session);

        assert_eq!(handle.as_str(), id);
        assert!(store.contains(&handle));
        assert_eq!(
            store.with(&handle, |s| s.value_of("<PERSON_0>").map(String::from)),
            Some(Some("Alice".to_string()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_with_mut() {
        let store = SessionStore::new();
        let handle = store.insert(Session::new());
        let token = store
            .with_mut(&handle, |s| s.allocate("Bob", &Category::Person))
            .unwrap();
        assert_eq!(token.to_string(), "<PERSON_0>");
        assert_eq!(store.get(&handle).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_handle() {
        let store = SessionStore::new();
        let other = SessionStore::new();
        let handle = other.insert(Session::new());
        assert!(store.with(&handle, |_| ()).is_none());
        assert!(store.with_mut(&handle, |_| ()).is_none());
        assert!(!store.remove(&handle));
        assert!(store.take(&handle).is_none());
    }

    #[test]
    fn test_remove_and_take() {
        let store = SessionStore::new();
        let a = store.insert(populated());
        let b = store.insert(populated());

        assert!(store.remove(&a));
        assert!(!store.contains(&a));

        let taken = store.take(&b).unwrap();
        assert_eq!(taken.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let store = SessionStore::new();
        let shared = store.clone();
        let handle = store.insert(Session::new());
        assert!(shared.contains(&handle));
        shared.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_handle_serializes_as_string() {
        let session = Session::new();
        let handle = SessionHandle::from(&session);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", session.id()));
        assert_eq!(handle.to_string(), session.id());
    }
}
