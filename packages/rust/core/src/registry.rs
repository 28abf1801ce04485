//! Ordered unit registry with the error-id counter for one pipeline lifetime.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::record::{ErrorRecord, NewError};
use crate::unit::{Unit, UnitKind};

/// Holds registered units in execution order plus the id counter for the
/// records they create.
///
/// The registry never reorders or deduplicates: registering the same unit
/// twice runs it twice.
pub struct Registry {
    kind: UnitKind,
    units: Vec<Arc<dyn Unit>>,
    last_id: u64,
}

impl Registry {
    /// Create an empty registry for units of `kind`.
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            units: Vec::new(),
            last_id: 0,
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Append a unit.
    pub fn register(&mut self, unit: impl Unit + 'static) {
        self.register_shared(Arc::new(unit));
    }

    /// Append an already shared unit.
    pub fn register_shared(&mut self, unit: Arc<dyn Unit>) {
        if unit.kind() != self.kind {
            warn!(
                unit = unit.name(),
                unit_kind = %unit.kind(),
                registry = %self.kind,
                "registering unit into a registry of another kind"
            );
        }
        debug!(unit = unit.name(), position = self.units.len(), "unit registered");
        self.units.push(unit);
    }

    /// Registered units in execution order.
    pub fn get(&self) -> &[Arc<dyn Unit>] {
        &self.units
    }

    /// A copy of the current unit list. Later registrations do not affect it.
    pub fn snapshot(&self) -> Vec<Arc<dyn Unit>> {
        self.units.clone()
    }

    /// Unit names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Return the next unused id, starting at 1.
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Issue an id and build the record around it.
    ///
    /// `default_type` is used unless the draft names a type explicitly.
    pub fn create_error(&mut self, default_type: &str, draft: NewError) -> ErrorRecord {
        let error_type = draft.error_type_or(default_type);
        ErrorRecord::new(self.next_id(), error_type, draft)
    }

    /// Drop every unit and reset the counter, leaving the registry as if new.
    pub fn clear(&mut self) {
        self.units.clear();
        self.last_id = 0;
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("units", &self.names())
            .field("last_id", &self.last_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use docs_toolchain_shared::Result;

    use super::*;
    use crate::unit::UnitContext;

    struct Named(&'static str);

    impl Unit for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn kind(&self) -> UnitKind {
            UnitKind::Extension
        }

        fn run(&self, _ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn get_preserves_registration_order() {
        let mut registry = Registry::new(UnitKind::Extension);
        for name in ["c", "a", "b", "a"] {
            registry.register(Named(name));
        }
        assert_eq!(registry.names(), vec!["c", "a", "b", "a"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn ids_are_contiguous_from_one() {
        let mut registry = Registry::new(UnitKind::Extension);
        let ids: Vec<u64> = (0..5)
            .map(|i| {
                registry
                    .create_error("check", NewError::new(format!("problem {i}")))
                    .id()
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(registry.next_id(), 6);
    }

    #[test]
    fn clear_resets_units_and_counter() {
        let mut registry = Registry::new(UnitKind::Extension);
        registry.register(Named("a"));
        registry.register(Named("b"));
        registry.create_error("a", NewError::new("one"));
        registry.create_error("a", NewError::new("two"));

        registry.clear();
        assert!(registry.get().is_empty());

        registry.register(Named("c"));
        let record = registry.create_error("c", NewError::new("fresh"));
        assert_eq!(record.id(), 1);
        assert_eq!(registry.names(), vec!["c"]);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_registration() {
        let mut registry = Registry::new(UnitKind::Extension);
        registry.register(Named("a"));
        let snapshot = registry.snapshot();
        registry.register(Named("b"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn create_error_applies_default_type() {
        let mut registry = Registry::new(UnitKind::Process);
        let record = registry.create_error("combine-js", NewError::new("no scripts"));
        assert_eq!(record.error_type(), "combine-js");
        assert_eq!(record.msg(), "no scripts");
        assert!(record.location().is_none());
    }
}
