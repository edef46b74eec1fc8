//! Pump registry: the fixed set of pump slots and their ingredients.
//!
//! Each slot is a hardware position with an immutable control line.  Only
//! the assigned ingredient changes at runtime, and every change is
//! written through to the [`PumpStore`] before it is considered done.
//!
//! Slots are kept sorted by key, which is the deterministic order used by
//! [`PumpRegistry::resolve`].

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::PumpStore;
use crate::error::{ConfigError, Error, Result};
use crate::recipes::same_ingredient;

/// Persisted form of one slot: `{ "name": .., "pin": .., "value": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpRecord {
    #[serde(default)]
    pub name: String,
    pub pin: u32,
    #[serde(default)]
    pub value: Option<String>,
}

/// The whole persisted table, keyed by slot.
pub type PumpTable = BTreeMap<String, PumpRecord>;

/// One pump position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpSlot {
    key: String,
    name: String,
    line: u32,
    ingredient: Option<String>,
}

impl PumpSlot {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control line driving this pump's relay.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn ingredient(&self) -> Option<&str> {
        self.ingredient.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpRegistry {
    slots: Vec<PumpSlot>,
}

impl PumpRegistry {
    /// Load the registry from its store.  Fails if the store is missing,
    /// malformed, empty, or maps two slots to the same line.
    pub fn load(store: &dyn PumpStore) -> std::result::Result<Self, ConfigError> {
        let registry = Self::from_table(store.load()?)?;
        info!("Pump registry loaded: {} slots", registry.slots.len());
        Ok(registry)
    }

    pub fn from_table(table: PumpTable) -> std::result::Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::Invalid("pump configuration has no slots".to_owned()));
        }

        let mut seen = BTreeSet::new();
        let mut slots = Vec::with_capacity(table.len());
        for (key, record) in table {
            if !seen.insert(record.pin) {
                return Err(ConfigError::Invalid(format!(
                    "slot '{key}' reuses control line {}",
                    record.pin
                )));
            }
            let name = if record.name.trim().is_empty() {
                key.clone()
            } else {
                record.name
            };
            slots.push(PumpSlot {
                key,
                name,
                line: record.pin,
                ingredient: normalise(record.value),
            });
        }
        Ok(Self { slots })
    }

    /// Snapshot in persisted form.
    pub fn to_table(&self) -> PumpTable {
        self.slots
            .iter()
            .map(|s| {
                (
                    s.key.clone(),
                    PumpRecord {
                        name: s.name.clone(),
                        pin: s.line,
                        value: s.ingredient.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn slots(&self) -> &[PumpSlot] {
        &self.slots
    }

    pub fn slot(&self, key: &str) -> Option<&PumpSlot> {
        self.slots.iter().find(|s| s.key == key)
    }

    /// Every control line, in slot order.
    pub fn lines(&self) -> Vec<u32> {
        self.slots.iter().map(PumpSlot::line).collect()
    }

    /// First slot (in key order) carrying `ingredient`.
    pub fn resolve(&self, ingredient: &str) -> Option<&PumpSlot> {
        self.slots.iter().find(|s| {
            s.ingredient
                .as_deref()
                .is_some_and(|assigned| same_ingredient(assigned, ingredient))
        })
    }

    /// Assign `ingredient` (or clear with `None`) and persist the whole
    /// table.  On a failed write the slot keeps its previous ingredient.
    pub fn assign(
        &mut self,
        key: &str,
        ingredient: Option<&str>,
        store: &dyn PumpStore,
    ) -> Result<()> {
        let idx = self
            .slots
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| Error::UnknownSlot(key.to_owned()))?;

        let next = normalise(ingredient.map(str::to_owned));
        let previous = std::mem::replace(&mut self.slots[idx].ingredient, next);

        if let Err(e) = store.save(&self.to_table()) {
            warn!("Saving pump configuration failed ({e}), rolling back '{key}'");
            self.slots[idx].ingredient = previous;
            return Err(e.into());
        }

        info!(
            "Pump '{}' (line {}) now carries {:?}",
            key, self.slots[idx].line, self.slots[idx].ingredient
        );
        Ok(())
    }
}

fn normalise(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
