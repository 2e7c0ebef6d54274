// crates/growth-core/src/identity.rs
// ============================================================================
// Module: Identity Model
// Description: Anonymous/identified distinct-id lifecycle and per-id
// property bags.
// Purpose: Canonical in-memory shape for the identity store (spec §4.3);
// persistence is handled by `growth-store`.
// Dependencies: crate::events, crate::identifiers
// ============================================================================

//! ## Overview
//! [`Identity`] tracks the anonymous id (always present), the optional
//! distinct id, and a property bag per id. The effective distinct id is
//! `distinct_id ?? anonymous_id` (spec §3); this invariant is enforced by
//! [`Identity::effective_distinct_id`] rather than by duplicating the
//! fallback at every call site.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::events::PropertyBag;
use crate::identifiers::DistinctId;

// ============================================================================
// SECTION: Event Linking Policy
// ============================================================================

/// Governs whether past anonymous events are reassigned on `identify`
/// (spec §4.2, §8 scenario 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLinkingPolicy {
    /// Anonymous events stay under the anonymous id; only new events use
    /// the identified id.
    KeepSeparate,
    /// Past anonymous events are rewritten to the new distinct id.
    MigrateOnIdentify,
}

impl Default for EventLinkingPolicy {
    fn default() -> Self {
        Self::MigrateOnIdentify
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Identity state: an always-present anonymous id, an optional distinct
/// id, and a property bag per id (spec §3).
///
/// # Invariants
/// - `anonymous_id` is minted once and persisted; it is never empty.
/// - `effective_distinct_id()` is never empty once this struct exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// The anonymous id, minted once at first use and persisted across restarts.
    pub anonymous_id: DistinctId,
    /// The app-assigned distinct id, set by `identify` and cleared by `reset`.
    pub distinct_id: Option<DistinctId>,
    /// Property bags keyed by distinct id (anonymous and identified ids
    /// each get their own bag until/unless migrated).
    pub property_bags: BTreeMap<DistinctId, PropertyBag>,
}

impl Identity {
    /// Creates a fresh identity with a newly minted anonymous id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anonymous_id: DistinctId::new_anonymous(),
            distinct_id: None,
            property_bags: BTreeMap::new(),
        }
    }

    /// Restores an identity from persisted fields.
    #[must_use]
    pub fn restore(
        anonymous_id: DistinctId,
        distinct_id: Option<DistinctId>,
        property_bags: BTreeMap<DistinctId, PropertyBag>,
    ) -> Self {
        Self {
            anonymous_id,
            distinct_id,
            property_bags,
        }
    }

    /// Returns the effective distinct id: `distinct_id ?? anonymous_id`.
    #[must_use]
    pub fn effective_distinct_id(&self) -> DistinctId {
        self.distinct_id.clone().unwrap_or_else(|| self.anonymous_id.clone())
    }

    /// Returns true once a distinct id has been set via `identify`.
    #[must_use]
    pub const fn is_identified(&self) -> bool {
        self.distinct_id.is_some()
    }

    /// Returns the property bag for the effective distinct id.
    #[must_use]
    pub fn current_properties(&self) -> PropertyBag {
        self.property_bags.get(&self.effective_distinct_id()).cloned().unwrap_or_default()
    }

    /// Applies `identify`: sets the distinct id (first call only triggers
    /// the anonymous-to-identified transition), migrating the anonymous
    /// property bag into the new id's bag. Returns `true` when this call
    /// performed the anonymous-to-identified transition, which is the
    /// signal the caller uses to decide whether to emit `$identify`
    /// (spec §4.3: "only on the anonymous->identified transition").
    pub fn identify(&mut self, new_distinct_id: DistinctId, props: PropertyBag) -> bool {
        let was_anonymous = self.distinct_id.is_none();
        let migrated_from = if was_anonymous {
            self.property_bags.remove(&self.anonymous_id)
        } else {
            None
        };

        let bag = self.property_bags.entry(new_distinct_id.clone()).or_default();
        if let Some(migrated) = migrated_from {
            bag.extend(migrated);
        }
        bag.extend(props);

        self.distinct_id = Some(new_distinct_id);
        was_anonymous
    }

    /// Applies `reset`: clears the distinct id and all property bags. If
    /// `keep_anonymous` is false, a fresh anonymous id is minted.
    pub fn reset(&mut self, keep_anonymous: bool) {
        self.distinct_id = None;
        self.property_bags.clear();
        if !keep_anonymous {
            self.anonymous_id = DistinctId::new_anonymous();
        }
    }

    /// Sets user properties on the effective distinct id's bag, honoring
    /// `set_once` semantics for keys already present.
    pub fn set_properties(&mut self, props: PropertyBag, set_once: bool) {
        let effective = self.effective_distinct_id();
        let bag = self.property_bags.entry(effective).or_default();
        for (key, value) in props {
            if set_once && bag.contains_key(&key) {
                continue;
            }
            bag.insert(key, value);
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}
