// crates/growth-sdk/src/session.rs
// ============================================================================
// Module: Session Handle
// Description: The facade's notion of "the current session" (spec §6:
// "Session API: start/get/set/end/reset").
// Purpose: Stamps every tracked event with a session id and carries a small
// bag of session-scoped properties, independent of identity.
// Dependencies: growth-core, uuid
// ============================================================================

//! ## Overview
//! A session is local, in-memory state: an id plus a property bag, neither
//! of which the core or broker ever reasons about directly. `track` reads
//! the current session id (if any) and stamps it onto the `Event` via
//! [`growth_core::Event::with_session`]; nothing else in the crate
//! consults session state.

use std::sync::RwLock;

use growth_core::DynValue;
use growth_core::PropertyBag;
use uuid::Uuid;

/// A snapshot of the current session, returned by [`SessionHandle::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    /// The active session id, if a session has been started.
    pub session_id: Option<String>,
    /// Properties set on the current session.
    pub properties: PropertyBag,
}

#[derive(Debug, Default)]
struct SessionState {
    session_id: Option<String>,
    properties: PropertyBag,
}

/// Owns the process's current session state.
#[derive(Debug, Default)]
pub struct SessionHandle {
    inner: RwLock<SessionState>,
}

impl SessionHandle {
    /// An empty, not-yet-started session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Starts a session under `session_id`, or mints a fresh UUIDv7-style
    /// id when none is given. Clears any properties from a prior session.
    /// Returns the id now in effect.
    pub fn start(&self, session_id: Option<String>) -> String {
        let id = session_id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let mut state = self.write();
        state.session_id = Some(id.clone());
        state.properties = PropertyBag::new();
        id
    }

    /// The current session, if one has been started.
    #[must_use]
    pub fn get(&self) -> SessionInfo {
        let state = self.read();
        SessionInfo { session_id: state.session_id.clone(), properties: state.properties.clone() }
    }

    /// The current session id, if any, for stamping onto tracked events.
    #[must_use]
    pub fn current_id(&self) -> Option<String> {
        self.read().session_id.clone()
    }

    /// Merges `properties` into the current session's property bag.
    /// A no-op if no session is active.
    pub fn set(&self, properties: PropertyBag) {
        let mut state = self.write();
        if state.session_id.is_none() {
            return;
        }
        for (key, value) in properties {
            state.properties.insert(key, value);
        }
    }

    /// Sets a single session property by key, for convenience callers that
    /// don't already have a [`PropertyBag`] in hand.
    pub fn set_one(&self, key: impl Into<String>, value: DynValue) {
        let mut bag = PropertyBag::new();
        bag.insert(key.into(), value);
        self.set(bag);
    }

    /// Ends the current session, clearing its id and properties.
    pub fn end(&self) {
        let mut state = self.write();
        state.session_id = None;
        state.properties = PropertyBag::new();
    }

    /// Ends the current session and immediately starts a new one, returning
    /// its id.
    pub fn reset(&self) -> String {
        self.start(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_without_id_mints_one() {
        let session = SessionHandle::new();
        let id = session.start(None);
        assert!(!id.is_empty());
        assert_eq!(session.current_id(), Some(id));
    }

    #[test]
    fn set_is_noop_without_an_active_session() {
        let session = SessionHandle::new();
        session.set_one("plan", DynValue::String("pro".to_string()));
        assert!(session.get().properties.is_empty());
    }

    #[test]
    fn set_merges_into_the_active_session() {
        let session = SessionHandle::new();
        session.start(Some("s1".to_string()));
        session.set_one("plan", DynValue::String("pro".to_string()));
        let info = session.get();
        assert_eq!(info.session_id.as_deref(), Some("s1"));
        assert_eq!(info.properties.get("plan"), Some(&DynValue::String("pro".to_string())));
    }

    #[test]
    fn end_clears_id_and_properties() {
        let session = SessionHandle::new();
        session.start(Some("s1".to_string()));
        session.set_one("plan", DynValue::String("pro".to_string()));
        session.end();
        assert_eq!(session.get(), SessionInfo::default());
    }

    #[test]
    fn reset_starts_a_fresh_session() {
        let session = SessionHandle::new();
        let first = session.start(Some("s1".to_string()));
        session.set_one("plan", DynValue::String("pro".to_string()));
        let second = session.reset();
        assert_ne!(first, second);
        assert!(session.get().properties.is_empty());
    }
}
