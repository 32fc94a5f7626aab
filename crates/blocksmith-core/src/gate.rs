//! Capability gate
//!
//! Maps the selected components to the set of block types that may be
//! placed. The gate never edits the graph: blocks of a type that becomes
//! disallowed stay where they are and are only reported by
//! [`CapabilityGate::violations`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::block::Capability;
use crate::component::{ComponentKind, ComponentSelection};
use crate::error::{Error, Result};
use crate::registry::{BlockRegistry, ENTRY_POINT};
use crate::workspace::Workspace;

/// One palette category and the allowed types in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteCategory {
    /// Category name
    pub name: String,
    /// Allowed type ids in registration order
    pub types: Vec<String>,
}

/// A placed block whose type is not currently allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Offending block id
    pub block_id: String,
    /// Its type id
    pub block_type: String,
}

/// Derives allowed block types from a component selection
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    registry: Arc<BlockRegistry>,
}

impl CapabilityGate {
    /// Gate over the given registry
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }

    /// Underlying registry
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Allowed type ids for a selection. Depends only on the set of kinds
    /// present, never on instance count or order.
    pub fn allowed_types(&self, selection: &ComponentSelection) -> BTreeSet<String> {
        self.allowed_for_kinds(&selection.kinds())
    }

    /// Allowed type ids for a set of component kinds
    pub fn allowed_for_kinds(&self, kinds: &BTreeSet<ComponentKind>) -> BTreeSet<String> {
        let mut allowed = BTreeSet::from([ENTRY_POINT.to_string()]);
        for block_type in self.registry.types() {
            let unlocked = match &block_type.capability {
                Capability::Base => true,
                Capability::Components(required) => !required.is_disjoint(kinds),
            };
            if unlocked {
                allowed.insert(block_type.id.clone());
            }
        }
        allowed
    }

    /// Fail with [`Error::CapabilityViolation`] unless `block_type` is allowed
    pub fn check(&self, allowed: &BTreeSet<String>, block_type: &str) -> Result<()> {
        self.registry.describe(block_type)?;
        if allowed.contains(block_type) {
            Ok(())
        } else {
            Err(Error::CapabilityViolation {
                block_type: block_type.to_string(),
            })
        }
    }

    /// Palette contents for a selection: categories in catalog order, empty
    /// categories omitted
    pub fn palette(&self, selection: &ComponentSelection) -> Vec<PaletteCategory> {
        let allowed = self.allowed_types(selection);
        self.registry
            .categories()
            .into_iter()
            .filter_map(|category| {
                let types: Vec<String> = self
                    .registry
                    .types()
                    .filter(|t| t.category == category && allowed.contains(&t.id))
                    .map(|t| t.id.clone())
                    .collect();
                (!types.is_empty()).then(|| PaletteCategory {
                    name: category.to_string(),
                    types,
                })
            })
            .collect()
    }

    /// Placed blocks whose type is outside `allowed`
    pub fn violations(&self, workspace: &Workspace, allowed: &BTreeSet<String>) -> Vec<Violation> {
        let mut violations = Vec::new();
        workspace.walk(&mut |block| {
            if !allowed.contains(&block.block_type) {
                violations.push(Violation {
                    block_id: block.id.clone(),
                    block_type: block.block_type.clone(),
                });
            }
        });
        if !violations.is_empty() {
            tracing::warn!(
                "{} placed blocks are not available for the selected components",
                violations.len()
            );
        }
        violations
    }
}

/// Notification that the allowed type set changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteRefresh {
    /// The new allowed set
    pub allowed: BTreeSet<String>,
    /// Types that became available
    pub added: BTreeSet<String>,
    /// Types that are no longer available
    pub removed: BTreeSet<String>,
}

/// Remembers the last allowed set and reports changes to it
#[derive(Debug, Clone, Default)]
pub struct PaletteTracker {
    current: Option<BTreeSet<String>>,
}

impl PaletteTracker {
    /// Tracker that reports the first update unconditionally
    pub fn new() -> Self {
        Self::default()
    }

    /// Last allowed set seen
    pub fn current(&self) -> Option<&BTreeSet<String>> {
        self.current.as_ref()
    }

    /// Record a freshly derived allowed set; returns a refresh only if it
    /// differs from the previous one
    pub fn update(&mut self, allowed: BTreeSet<String>) -> Option<PaletteRefresh> {
        let previous = match self.current.replace(allowed.clone()) {
            Some(previous) if previous == allowed => return None,
            Some(previous) => previous,
            None => BTreeSet::new(),
        };
        let added: BTreeSet<String> = allowed.difference(&previous).cloned().collect();
        let removed: BTreeSet<String> = previous.difference(&allowed).cloned().collect();
        tracing::debug!(
            "palette refresh: {} added, {} removed",
            added.len(),
            removed.len()
        );
        Some(PaletteRefresh {
            allowed,
            added,
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentInstance;
    use rstest::rstest;

    fn gate() -> CapabilityGate {
        CapabilityGate::new(Arc::new(BlockRegistry::builtin()))
    }

    fn selection(kinds: &[(&str, ComponentKind)]) -> ComponentSelection {
        let mut selection = ComponentSelection::new();
        for (id, kind) in kinds {
            selection
                .add(ComponentInstance::new(*id, *kind, id.to_string()))
                .unwrap();
        }
        selection
    }

    #[test]
    fn test_base_set_without_components() {
        let gate = gate();
        let allowed = gate.allowed_types(&ComponentSelection::new());
        assert!(allowed.contains(ENTRY_POINT));
        assert!(allowed.contains("arduino_delay"));
        assert!(allowed.contains("controls_if"));
        assert!(!allowed.contains("component_led"));
        assert!(!allowed.contains("arduino_imu_read"));
    }

    #[rstest]
    #[case(ComponentKind::Led, "component_led")]
    #[case(ComponentKind::Led, "arduino_pin_mode")]
    #[case(ComponentKind::Button, "arduino_pin_mode")]
    #[case(ComponentKind::Button, "arduino_digital_read")]
    #[case(ComponentKind::Temperature, "arduino_temperature_read")]
    #[case(ComponentKind::Humidity, "arduino_sensor_begin")]
    #[case(ComponentKind::Imu, "component_imu")]
    #[case(ComponentKind::Microphone, "arduino_microphone_read")]
    fn test_component_unlocks(#[case] kind: ComponentKind, #[case] block_type: &str) {
        let gate = gate();
        let allowed = gate.allowed_types(&selection(&[("c", kind)]));
        assert!(allowed.contains(block_type));
    }

    #[test]
    fn test_allowed_types_independent_of_order_and_multiplicity() {
        let gate = gate();
        let ab = selection(&[("a", ComponentKind::Led), ("b", ComponentKind::Button)]);
        let ba = selection(&[("b", ComponentKind::Button), ("a", ComponentKind::Led)]);
        let aba = selection(&[
            ("a", ComponentKind::Led),
            ("b", ComponentKind::Button),
            ("a2", ComponentKind::Led),
        ]);
        assert_eq!(gate.allowed_types(&ab), gate.allowed_types(&ba));
        assert_eq!(gate.allowed_types(&ab), gate.allowed_types(&aba));
    }

    #[test]
    fn test_check_reports_violation_and_unknown_type() {
        let gate = gate();
        let allowed = gate.allowed_types(&ComponentSelection::new());
        assert!(gate.check(&allowed, "arduino_delay").is_ok());
        assert!(matches!(
            gate.check(&allowed, "component_led"),
            Err(Error::CapabilityViolation { .. })
        ));
        assert!(matches!(
            gate.check(&allowed, "arduino_laser"),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_palette_omits_locked_categories() {
        let gate = gate();
        let palette = gate.palette(&ComponentSelection::new());
        assert_eq!(palette[0].name, "Program");
        assert!(palette.iter().all(|c| c.name != "Sensors" && c.name != "Components"));

        let palette = gate.palette(&selection(&[("imu", ComponentKind::Imu)]));
        let sensors = palette.iter().find(|c| c.name == "Sensors").unwrap();
        assert_eq!(sensors.types, vec!["arduino_imu_begin", "arduino_imu_read"]);
    }

    #[test]
    fn test_violations_flag_without_removing() {
        let registry = BlockRegistry::builtin();
        let gate = CapabilityGate::new(Arc::new(registry.clone()));
        let mut workspace = Workspace::with_entry_point(&registry).unwrap();
        let led = registry.instantiate("component_led", "led").unwrap();
        workspace
            .insert(&registry, led, crate::workspace::Placement::TopLevel)
            .unwrap();

        let allowed = gate.allowed_types(&ComponentSelection::new());
        let violations = gate.violations(&workspace, &allowed);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].block_id, "led");
        assert!(workspace.contains("led"));
    }

    #[test]
    fn test_tracker_reports_only_changes() {
        let gate = gate();
        let mut tracker = PaletteTracker::new();
        let base = gate.allowed_types(&ComponentSelection::new());
        assert!(tracker.update(base.clone()).is_some());
        assert!(tracker.update(base.clone()).is_none());

        let with_led = gate.allowed_types(&selection(&[("led", ComponentKind::Led)]));
        let refresh = tracker.update(with_led).unwrap();
        assert!(refresh.added.contains("component_led"));
        assert!(refresh.removed.is_empty());

        let refresh = tracker.update(base).unwrap();
        assert!(refresh.removed.contains("component_led"));
    }
}
