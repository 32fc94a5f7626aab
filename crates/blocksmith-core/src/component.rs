//! Selected hardware components
//!
//! The component selection is edited independently of the block graph and
//! only influences which block types the capability gate allows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Supported hardware/feature component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// External LED on a digital pin
    Led,
    /// Push button on a digital pin
    Button,
    /// On-board HTS221 temperature sensor
    Temperature,
    /// On-board HTS221 humidity sensor
    Humidity,
    /// On-board LSM6DS3 motion sensor
    Imu,
    /// On-board MP34DT05 microphone
    Microphone,
}

impl ComponentKind {
    /// Every supported kind, in palette order
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Led,
        ComponentKind::Button,
        ComponentKind::Temperature,
        ComponentKind::Humidity,
        ComponentKind::Imu,
        ComponentKind::Microphone,
    ];

    /// Stable identifier used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Led => "led",
            ComponentKind::Button => "button",
            ComponentKind::Temperature => "temperature",
            ComponentKind::Humidity => "humidity",
            ComponentKind::Imu => "imu",
            ComponentKind::Microphone => "microphone",
        }
    }

    /// On-board sensors exist once per board, so at most one instance may be selected
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            ComponentKind::Temperature
                | ComponentKind::Humidity
                | ComponentKind::Imu
                | ComponentKind::Microphone
        )
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            ComponentKind::Led => "Light Emitting Diode",
            ComponentKind::Button => "Push Button",
            ComponentKind::Temperature => "HTS221 Temperature",
            ComponentKind::Humidity => "HTS221 Humidity",
            ComponentKind::Imu => "IMU Accelerometer",
            ComponentKind::Microphone => "MP34DT05 Microphone",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!("unknown component kind '{}'", s),
            })
    }
}

/// One selected component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Stable instance id
    pub id: String,
    /// Component kind
    pub kind: ComponentKind,
    /// Display name
    pub name: String,
}

impl ComponentInstance {
    /// Create an instance
    pub fn new(id: impl Into<String>, kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
        }
    }
}

/// Ordered sequence of selected components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentSelection {
    instances: Vec<ComponentInstance>,
}

impl ComponentSelection {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection, enforcing the exclusivity rules
    pub fn from_instances(instances: impl IntoIterator<Item = ComponentInstance>) -> Result<Self> {
        let mut selection = Self::new();
        for instance in instances {
            selection.add(instance)?;
        }
        Ok(selection)
    }

    /// Add a component.
    ///
    /// Returns `Ok(false)` if an instance with the same id is already
    /// selected. Fails with [`Error::ExclusiveComponent`] when the kind is
    /// exclusive and already present.
    pub fn add(&mut self, instance: ComponentInstance) -> Result<bool> {
        if self.instances.iter().any(|c| c.id == instance.id) {
            tracing::debug!("component '{}' already selected", instance.id);
            return Ok(false);
        }
        if instance.kind.is_exclusive() && self.instances.iter().any(|c| c.kind == instance.kind)
        {
            return Err(Error::ExclusiveComponent {
                kind: instance.kind.to_string(),
            });
        }
        tracing::debug!("selected component '{}' ({})", instance.id, instance.kind);
        self.instances.push(instance);
        Ok(true)
    }

    /// Remove a component by id, returning it if it was selected
    pub fn remove(&mut self, id: &str) -> Option<ComponentInstance> {
        let index = self.instances.iter().position(|c| c.id == id)?;
        Some(self.instances.remove(index))
    }

    /// Remove every component
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Selected instances in selection order
    pub fn instances(&self) -> &[ComponentInstance] {
        &self.instances
    }

    /// Distinct kinds present in the selection
    pub fn kinds(&self) -> BTreeSet<ComponentKind> {
        self.instances.iter().map(|c| c.kind).collect()
    }

    /// Number of selected instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
