// crates/growth-sdk/src/identity.rs
// ============================================================================
// Module: Identity Handle
// Description: The one live `Identity` the facade and the journey engine
// both read and write.
// Purpose: Implements every port the IR evaluator and journey executor
// need for "the current user" (`UserView`, `CustomerUpdater`,
// `CurrentUser`) over a single shared, lock-guarded `Identity` (spec §4.3).
// Dependencies: growth-core, growth-ir, growth-journey, growth-store
// ============================================================================

//! ## Overview
//! The whole core assumes one globally "current" identity at a time: none
//! of `UserView`, `SegmentAdapter`, `FeatureAdapter`, or
//! `EventHistoryAdapter` take a distinct id per call. [`IdentityHandle`] is
//! the seam that holds that current identity and answers every adapter
//! that needs it, the same way [`growth_providers::ProfileCache`] answers
//! every adapter from its single cached snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::RwLock;

use growth_core::DistinctId;
use growth_core::DynValue;
use growth_core::Identity;
use growth_core::PropertyBag;
use growth_ir::IrValue;
use growth_ir::context::UserView;
use growth_journey::ports::CustomerUpdater;
use growth_store::CurrentUser;

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// Narrows a stored property value to the IR's value domain, mirroring
/// `growth_store::history`'s `dyn_to_ir` (nested maps have no IR
/// representation and read as absent rather than failing evaluation).
fn dyn_to_ir(value: &DynValue) -> IrValue {
    match value {
        DynValue::Null | DynValue::Map(_) => IrValue::Null,
        DynValue::Bool(flag) => IrValue::Bool(*flag),
        DynValue::Number(number) => IrValue::Number(number.clone()),
        DynValue::String(text) => IrValue::String(text.clone()),
        DynValue::Timestamp(at) => IrValue::Timestamp(*at),
        DynValue::Duration(duration) => IrValue::Duration(duration.whole_seconds()),
        DynValue::List(items) => IrValue::List(items.iter().map(dyn_to_ir).collect()),
    }
}

// ============================================================================
// SECTION: IdentityHandle
// ============================================================================

/// The current process's identity, shared between the facade (which
/// mutates it on `identify`/`reset`/property updates) and every port that
/// needs to read or write "the current user" (spec §4.3).
pub struct IdentityHandle {
    inner: RwLock<Identity>,
}

impl IdentityHandle {
    /// Wraps an already-loaded (or freshly minted) identity.
    #[must_use]
    pub fn new(identity: Identity) -> Arc<Self> {
        Arc::new(Self { inner: RwLock::new(identity) })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Identity> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Identity> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns a clone of the identity's current state, for persistence or
    /// for accessor methods on the facade.
    #[must_use]
    pub fn snapshot(&self) -> Identity {
        self.read().clone()
    }

    /// Applies `identify`, returning whether this call performed the
    /// anonymous-to-identified transition (spec §4.3).
    pub fn identify(&self, new_distinct_id: DistinctId, props: PropertyBag) -> bool {
        self.write().identify(new_distinct_id, props)
    }

    /// Applies `reset`.
    pub fn reset(&self, keep_anonymous: bool) {
        self.write().reset(keep_anonymous);
    }

    /// Sets properties on the current user, honoring `set_once`.
    pub fn set_properties(&self, props: PropertyBag, set_once: bool) {
        self.write().set_properties(props, set_once);
    }
}

impl UserView for IdentityHandle {
    fn get(&self, key: &str) -> Option<IrValue> {
        self.read().current_properties().get(key).map(dyn_to_ir)
    }
}

impl CustomerUpdater for IdentityHandle {
    fn update(&self, distinct_id: &str, attributes: PropertyBag) {
        let current = self.read().effective_distinct_id();
        if current.as_str() != distinct_id {
            tracing::warn!(
                requested = distinct_id,
                current = current.as_str(),
                "UpdateCustomer node targeted a distinct id other than the current user; applying to the current user anyway"
            );
        }
        self.write().set_properties(attributes, false);
    }
}

impl CurrentUser for IdentityHandle {
    fn distinct_id(&self) -> DistinctId {
        self.read().effective_distinct_id()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn get_reflects_current_properties() {
        let handle = IdentityHandle::new(Identity::new());
        let mut props = PropertyBag::new();
        props.insert("plan".to_string(), DynValue::String("pro".to_string()));
        handle.set_properties(props, false);
        assert_eq!(handle.get("plan"), Some(IrValue::String("pro".to_string())));
        assert_eq!(handle.get("missing"), None);
    }

    #[test]
    fn distinct_id_falls_back_to_anonymous_until_identified() {
        let handle = IdentityHandle::new(Identity::new());
        let anon = handle.snapshot().anonymous_id;
        assert_eq!(CurrentUser::distinct_id(handle.as_ref()), anon);

        let transitioned = handle.identify(DistinctId::new("u1"), PropertyBag::new());
        assert!(transitioned);
        assert_eq!(CurrentUser::distinct_id(handle.as_ref()), DistinctId::new("u1"));
    }

    #[test]
    fn customer_updater_merges_attributes() {
        let handle = IdentityHandle::new(Identity::new());
        let mut attrs = PropertyBag::new();
        attrs.insert("score".to_string(), DynValue::from_i64(7));
        let distinct_id = handle.snapshot().effective_distinct_id().as_str().to_string();
        CustomerUpdater::update(handle.as_ref(), &distinct_id, attrs);
        assert_eq!(handle.get("score"), Some(IrValue::from_i64(7)));
    }
}
