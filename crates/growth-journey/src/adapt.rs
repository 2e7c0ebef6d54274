// crates/growth-journey/src/adapt.rs
// ============================================================================
// Module: Value and View Adapters
// Description: The boundary between `growth-core`'s `DynValue`/property bags
// and `growth-ir`'s `IrValue`/`UserView`/`EventView`.
// Purpose: Keep the evaluator's value vocabulary independent of the domain
// crate's (spec §4.1 separation); conversion lives here, at the one crate
// that depends on both.
// Dependencies: growth-core, growth-ir
// ============================================================================

use growth_core::DynValue;
use growth_core::Event;
use growth_core::PropertyBag;
use growth_ir::IrValue;
use growth_ir::context::EventView;
use growth_ir::context::UserView;

/// Converts a domain [`DynValue`] to the evaluator's [`IrValue`].
///
/// `Map` has no `IrValue` counterpart (the evaluator's vocabulary is
/// intentionally narrower); it converts to `Null`, which evaluates as
/// "unset" everywhere the predicate language inspects it.
#[must_use]
pub fn dyn_value_to_ir_value(value: &DynValue) -> IrValue {
    match value {
        DynValue::Null | DynValue::Map(_) => IrValue::Null,
        DynValue::Bool(flag) => IrValue::Bool(*flag),
        DynValue::Number(number) => IrValue::Number(number.clone()),
        DynValue::String(text) => IrValue::String(text.clone()),
        DynValue::Timestamp(at) => IrValue::Timestamp(*at),
        DynValue::Duration(duration) => IrValue::Duration(duration.whole_seconds()),
        DynValue::List(items) => IrValue::List(items.iter().map(dyn_value_to_ir_value).collect()),
    }
}

/// A [`UserView`] over a plain property bag (the current user's merged
/// anonymous/identified properties).
pub struct PropertyBagUserView<'a>(pub &'a PropertyBag);

impl UserView for PropertyBagUserView<'_> {
    fn get(&self, key: &str) -> Option<IrValue> {
        self.0.get(key).map(dyn_value_to_ir_value)
    }
}

/// An [`EventView`] over a domain [`Event`].
pub struct CoreEventView<'a>(pub &'a Event);

impl EventView for CoreEventView<'_> {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn get(&self, key: &str) -> Option<IrValue> {
        self.0.properties.get(key).map(dyn_value_to_ir_value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use growth_core::DistinctId;

    use super::*;

    #[test]
    fn map_values_convert_to_null() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("a".to_string(), DynValue::from_i64(1));
        assert_eq!(dyn_value_to_ir_value(&DynValue::Map(map)), IrValue::Null);
    }

    #[test]
    fn event_view_reads_properties_by_key() {
        let mut event = Event::new("purchase", DistinctId::new("u1"), time::OffsetDateTime::now_utc());
        event.properties.insert("amount".to_string(), DynValue::from_i64(10));
        let view = CoreEventView(&event);
        assert_eq!(view.name(), "purchase");
        assert_eq!(view.get("amount"), Some(IrValue::from_i64(10)));
        assert_eq!(view.get("missing"), None);
    }
}
