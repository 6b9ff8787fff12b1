//! Ordered collection of base layers and overlays shown by the chooser.
//!
//! Entries are kept sorted by `sort_priority`; entries with equal priority
//! keep their insertion order. Layer names are expected to be unique. When
//! they are not, lookups by name return the first entry in render order and
//! a warning is logged at insertion time.

use crate::config::ChooserConfig;
use crate::models::layer::{LayerEntry, LayerId, LayerMeta, LayerOptions, LayerRef};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LayerRegistry {
    entries: Vec<LayerEntry>,
    remembered: HashMap<LayerId, LayerMeta>,
    last_priority: i32,
    priority_step: i32,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::from_config(&ChooserConfig::default())
    }
}

impl LayerRegistry {
    pub fn new(initial_priority: i32, priority_step: i32) -> Self {
        LayerRegistry {
            entries: Vec::new(),
            remembered: HashMap::new(),
            last_priority: initial_priority,
            priority_step,
        }
    }

    pub fn from_config(config: &ChooserConfig) -> Self {
        Self::new(config.initial_priority, config.priority_step)
    }

    /// Entries added from now on get positive default priorities, sorting
    /// after everything seeded before this point.
    pub fn mark_ready(&mut self) {
        self.last_priority = 0;
    }

    fn next_priority(&mut self) -> i32 {
        self.last_priority += self.priority_step;
        self.last_priority
    }

    /// Registers `layer`. If the layer was registered before and removed with
    /// `keep_data`, its remembered name and flags win over `options`; `label`
    /// still replaces the display text.
    ///
    /// Returns the entry's render index.
    pub fn insert(
        &mut self,
        layer: LayerId,
        label: &str,
        overlay: bool,
        options: &LayerOptions,
    ) -> usize {
        if let Some(index) = self.position(LayerRef::Layer(layer)) {
            tracing::warn!("{:?} is already registered, updating label only", layer);
            self.entries[index].label = label.to_string();
            return index;
        }

        let meta = match self.remembered.get(&layer) {
            Some(meta) => meta.clone(),
            None => {
                let sort_priority = match options.sort_priority {
                    Some(priority) => priority,
                    None => self.next_priority(),
                };
                let meta = LayerMeta {
                    name: options.name.clone().unwrap_or_else(|| label.to_string()),
                    persistent: options.persistent.unwrap_or(true),
                    default_state: options.default_state.unwrap_or(true),
                    sort_priority,
                };
                self.remembered.insert(layer, meta.clone());
                meta
            }
        };

        if self.entries.iter().any(|e| e.name == meta.name) {
            tracing::warn!(
                "Duplicate layer name {:?}; lookups by name resolve to the first entry",
                meta.name
            );
        }

        let entry = LayerEntry {
            layer,
            name: meta.name,
            label: label.to_string(),
            overlay,
            sort_priority: meta.sort_priority,
            persistent: meta.persistent,
            default_state: meta.default_state,
            tracking: None,
        };
        let index = self
            .entries
            .partition_point(|e| e.sort_priority <= entry.sort_priority);
        self.entries.insert(index, entry);
        index
    }

    /// Detaches an entry from the registry. Unless `keep_data` is set, the
    /// layer's remembered configuration is dropped too.
    pub fn remove<'a>(&mut self, key: impl Into<LayerRef<'a>>, keep_data: bool) -> Option<LayerEntry> {
        let key = key.into();
        let Some(index) = self.position(key) else {
            tracing::warn!("Layer not found: {:?}", key);
            return None;
        };
        let entry = self.entries.remove(index);
        if !keep_data {
            self.remembered.remove(&entry.layer);
        }
        Some(entry)
    }

    pub fn position<'a>(&self, key: impl Into<LayerRef<'a>>) -> Option<usize> {
        match key.into() {
            LayerRef::Layer(layer) => self.entries.iter().position(|e| e.layer == layer),
            LayerRef::Name(name) => self.entries.iter().position(|e| e.name == name),
            LayerRef::Index(index) => (index < self.entries.len()).then_some(index),
        }
    }

    pub fn find<'a>(&self, key: impl Into<LayerRef<'a>>) -> Option<&LayerEntry> {
        self.position(key).map(|index| &self.entries[index])
    }

    pub(crate) fn find_mut<'a>(&mut self, key: impl Into<LayerRef<'a>>) -> Option<&mut LayerEntry> {
        self.position(key).map(move |index| &mut self.entries[index])
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.entries.iter().any(|e| e.layer == layer)
    }

    /// Sets the display label; `None` restores the entry's name.
    pub fn set_label<'a>(&mut self, key: impl Into<LayerRef<'a>>, label: Option<&str>) -> bool {
        let key = key.into();
        let Some(entry) = self.find_mut(key) else {
            tracing::warn!("Layer not found: {:?}", key);
            return false;
        };
        entry.label = label.map_or_else(|| entry.name.clone(), str::to_string);
        true
    }

    /// All entries in render order.
    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    pub fn overlays(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter().filter(|e| e.overlay)
    }

    pub fn base_layers(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter().filter(|e| !e.overlay)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn names(registry: &LayerRegistry) -> Vec<&str> {
        registry.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_seeded_layers_sort_before_later_ones() {
        let mut registry = LayerRegistry::default();
        registry.insert(LayerId::next(), "Seeded A", true, &LayerOptions::new());
        registry.insert(LayerId::next(), "Seeded B", true, &LayerOptions::new());
        registry.mark_ready();
        registry.insert(LayerId::next(), "Plugin", true, &LayerOptions::new());
        registry.insert(
            LayerId::next(),
            "Pinned",
            true,
            &LayerOptions::new().sort_priority(-1000),
        );

        assert_eq!(names(&registry), ["Pinned", "Seeded A", "Seeded B", "Plugin"]);
        let priorities: Vec<i32> = registry.entries().iter().map(|e| e.sort_priority).collect();
        assert_eq!(priorities, [-1000, -90, -80, 10]);
    }

    #[test]
    fn test_random_priorities_sort_stably() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut registry = LayerRegistry::default();
        let mut expected: Vec<(i32, usize)> = Vec::new();

        for i in 0..200 {
            let options = if rng.random_bool(0.5) {
                LayerOptions::new().sort_priority(rng.random_range(-5..5) * 10)
            } else {
                LayerOptions::new()
            };
            let index = registry.insert(LayerId::next(), &format!("layer {i}"), true, &options);
            expected.push((registry.entries()[index].sort_priority, i));
        }
        expected.sort_by_key(|(priority, _)| *priority);

        let actual: Vec<String> = registry.entries().iter().map(|e| e.name.clone()).collect();
        let expected: Vec<String> = expected.iter().map(|(_, i)| format!("layer {i}")).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_lookup_by_name_returns_first_match() {
        let mut registry = LayerRegistry::default();
        let first = LayerId::next();
        let second = LayerId::next();
        registry.insert(first, "Fields", true, &LayerOptions::new());
        registry.insert(second, "Fields", true, &LayerOptions::new());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("Fields").map(|e| e.layer), Some(first));
        assert_eq!(registry.find(second).map(|e| e.layer), Some(second));
    }

    #[test]
    fn test_set_label_resets_to_name() {
        let mut registry = LayerRegistry::default();
        let layer = LayerId::next();
        registry.insert(layer, "Links", true, &LayerOptions::new());

        for label in ["<b>Links</b>", "Links (3)", "x"] {
            assert!(registry.set_label(layer, Some(label)));
        }
        assert_eq!(registry.find(layer).unwrap().label, "x");

        assert!(registry.set_label("Links", None));
        assert_eq!(registry.find(layer).unwrap().label, "Links");
    }

    #[test]
    fn test_unknown_layer_is_a_noop() {
        let mut registry = LayerRegistry::default();
        assert!(!registry.set_label("missing", Some("x")));
        assert!(registry.remove("missing", false).is_none());
        assert!(registry.find(3usize).is_none());
    }

    #[test]
    fn test_keep_data_remembers_configuration() {
        let mut registry = LayerRegistry::default();
        let layer = LayerId::next();
        let options = LayerOptions::new()
            .name("Beacons")
            .sort_priority(500)
            .persistent(false)
            .default_state(false);
        registry.insert(layer, "Beacons (12)", true, &options);

        registry.remove(layer, true).unwrap();
        registry.insert(layer, "Beacons again", true, &LayerOptions::new());
        let entry = registry.find(layer).unwrap();
        assert_eq!(entry.name, "Beacons");
        assert_eq!(entry.label, "Beacons again");
        assert_eq!(entry.sort_priority, 500);
        assert!(!entry.persistent);
        assert!(!entry.default_state);

        registry.remove(layer, false).unwrap();
        registry.insert(layer, "Fresh", true, &LayerOptions::new());
        let entry = registry.find(layer).unwrap();
        assert_eq!(entry.name, "Fresh");
        assert!(entry.persistent);
    }

    #[test]
    fn test_reinserting_registered_layer_updates_label() {
        let mut registry = LayerRegistry::default();
        let layer = LayerId::next();
        registry.insert(layer, "Fields", true, &LayerOptions::new());
        registry.insert(layer, "Control Fields", true, &LayerOptions::new());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find(layer).unwrap().label, "Control Fields");
    }
}
