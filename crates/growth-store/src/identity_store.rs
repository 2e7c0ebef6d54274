// crates/growth-store/src/identity_store.rs
// ============================================================================
// Module: Identity Store
// Description: Durable single-row record of the anonymous/distinct id pair
// and per-id property bags (spec §6: "Identity record: anonymous id,
// distinct id, per-id property bags").
// Purpose: Let `Identity` survive a process restart; the row is a whole-
// object snapshot, replaced atomically on every save, matching the
// fetch-and-replace convention the profile cache and journey snapshots use.
// Dependencies: crate::schema, growth-core, rusqlite
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use growth_core::Identity;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::StoreError;

// ============================================================================
// SECTION: IdentityStore
// ============================================================================

/// Durable single-row store for the process's [`Identity`] (spec §6).
pub struct IdentityStore {
    conn: std::sync::Mutex<Connection>,
}

impl IdentityStore {
    /// Opens an identity store over `conn`, which must already have
    /// [`crate::schema::init`] applied.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: std::sync::Mutex::new(conn) }
    }

    /// Loads the persisted identity, if one has ever been saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn load(&self) -> Result<Option<Identity>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let raw: Option<String> = conn
            .query_row("SELECT payload FROM identity WHERE singleton = 0", [], |row| row.get(0))
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(StoreError::from)).transpose()
    }

    /// Replaces the persisted identity wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying write fails.
    pub fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let payload = serde_json::to_string(identity)?;
        conn.execute(
            "INSERT INTO identity (singleton, payload) VALUES (0, ?1)
             ON CONFLICT(singleton) DO UPDATE SET payload = excluded.payload",
            params![payload],
        )?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use growth_core::DistinctId;
    use growth_core::PropertyBag;

    use super::*;

    fn store() -> IdentityStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init(&conn).unwrap();
        IdentityStore::new(conn)
    }

    #[test]
    fn load_with_no_prior_save_is_none() {
        assert!(store().load().unwrap().is_none());
    }

    #[test]
    fn save_and_load_round_trips() {
        let store = store();
        let mut identity = Identity::new();
        identity.identify(DistinctId::new("u1"), PropertyBag::new());
        store.save(&identity).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, identity);
    }

    #[test]
    fn second_save_replaces_the_row() {
        let store = store();
        let mut identity = Identity::new();
        store.save(&identity).unwrap();

        identity.identify(DistinctId::new("u2"), PropertyBag::new());
        store.save(&identity).unwrap();

        assert_eq!(store.load().unwrap().unwrap().distinct_id, Some(DistinctId::new("u2")));
    }
}
