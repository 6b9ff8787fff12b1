//! Visibility controller: attaches and detaches registered layers, keeps at
//! most one base layer on the map and mirrors every overlay membership change
//! into the durable store.

use crate::bridge::strip_markup;
use crate::config::ChooserConfig;
use crate::models::layer::{
    LayerEntry, LayerId, LayerOptions, LayerRef, RemoveOptions, Subscription,
};
use crate::models::summary::{LayerSummary, LayerSummaryItem};
use crate::registry::LayerRegistry;
use crate::store::{KeyValueStore, LayerStateStore, OverlayStatusMap};
use crate::traits::MapSurface;
use std::collections::{BTreeMap, HashMap};

/// What a tracking subscription does when its layer's membership changes.
#[derive(Debug, Clone, PartialEq)]
enum Tracker {
    OverlayStatus { layer: LayerId, name: String },
    BaseSelection { layer: LayerId, name: String },
}

impl Tracker {
    fn layer(&self) -> LayerId {
        match self {
            Tracker::OverlayStatus { layer, .. } | Tracker::BaseSelection { layer, .. } => *layer,
        }
    }
}

pub struct LayerChooser<M, S> {
    pub(crate) registry: LayerRegistry,
    pub(crate) map: M,
    store: LayerStateStore<S>,
    overlay_status: OverlayStatusMap,
    trackers: BTreeMap<Subscription, Tracker>,
    next_subscription: u64,
    /// Internal layer sets of composite layers.
    composites: HashMap<LayerId, Vec<LayerId>>,
    pub(crate) solo_exclusions: Vec<String>,
}

impl<M: MapSurface, S: KeyValueStore> LayerChooser<M, S> {
    pub fn new(map: M, store: S, config: &ChooserConfig) -> Self {
        let store = LayerStateStore::from_config(store, config);
        let overlay_status = store.load_overlay_status();
        LayerChooser {
            registry: LayerRegistry::from_config(config),
            map,
            store,
            overlay_status,
            trackers: BTreeMap::new(),
            next_subscription: 1,
            composites: HashMap::new(),
            solo_exclusions: config.solo_exclusions.clone(),
        }
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn store(&self) -> &LayerStateStore<S> {
        &self.store
    }

    pub fn overlay_status(&self) -> &OverlayStatusMap {
        &self.overlay_status
    }

    pub fn mark_ready(&mut self) {
        self.registry.mark_ready();
    }

    pub fn add_base_layer(
        &mut self,
        layer: LayerId,
        name: &str,
        options: LayerOptions,
    ) -> Option<&LayerEntry> {
        self.add_layer(layer, name, false, options)
    }

    pub fn add_overlay(
        &mut self,
        layer: LayerId,
        name: &str,
        options: LayerOptions,
    ) -> Option<&LayerEntry> {
        self.add_layer(layer, name, true, options)
    }

    /// Registers a layer and settles its initial map membership.
    ///
    /// For persistent overlays the order of precedence is: an explicit
    /// `enable`, then a layer that is already on the map (recorded as on),
    /// then the stored state, then `default_state`.
    pub fn add_layer(
        &mut self,
        layer: LayerId,
        label: &str,
        overlay: bool,
        options: LayerOptions,
    ) -> Option<&LayerEntry> {
        if self.registry.contains(layer) {
            self.registry.insert(layer, label, overlay, &options);
            return self.registry.find(layer);
        }
        let index = self.registry.insert(layer, label, overlay, &options);
        let entry = self.registry.entries()[index].clone();

        if entry.persistent {
            let tracker = if overlay {
                Tracker::OverlayStatus {
                    layer,
                    name: entry.name.clone(),
                }
            } else {
                Tracker::BaseSelection {
                    layer,
                    name: entry.name.clone(),
                }
            };
            let subscription = self.subscribe(tracker);
            if let Some(e) = self.registry.find_mut(layer) {
                e.tracking = Some(subscription);
            }
        }

        if overlay {
            self.settle_overlay(&entry, options.enable);
        } else if let Some(enable) = options.enable {
            self.show(layer, enable);
        } else if entry.persistent && self.map.has_layer(layer) {
            self.record_base_layer(&entry.name);
        }

        tracing::debug!(
            "Added {} {:?} at index {}",
            if overlay { "overlay" } else { "base layer" },
            entry.name,
            index
        );
        self.registry.find(layer)
    }

    fn settle_overlay(&mut self, entry: &LayerEntry, enable: Option<bool>) {
        let layer = entry.layer;
        match enable {
            Some(enable) => {
                let changed = if enable { self.attach(layer) } else { self.detach(layer) };
                if entry.persistent && !changed {
                    self.record_overlay_state(&entry.name, enable);
                }
            }
            None if self.map.has_layer(layer) => {
                if entry.persistent {
                    self.record_overlay_state(&entry.name, true);
                }
            }
            None => {
                let display = if entry.persistent {
                    self.is_overlay_displayed(&entry.name, entry.default_state)
                } else {
                    entry.default_state
                };
                if display {
                    self.attach(layer);
                }
            }
        }
    }

    /// Removes a layer from the chooser and disposes of its tracking
    /// subscription. The map keeps the layer only with `keep_on_map`.
    pub fn remove_layer<'a>(
        &mut self,
        key: impl Into<LayerRef<'a>>,
        options: RemoveOptions,
    ) -> Option<LayerEntry> {
        let key = key.into();
        let Some(layer) = self.registry.find(key).map(|e| e.layer) else {
            tracing::warn!("Layer not found: {:?}", key);
            return None;
        };
        let mut entry = self.registry.remove(layer, options.keep_data)?;
        // untracked before detaching: removal never rewrites the stored state
        if let Some(subscription) = entry.tracking.take() {
            self.unsubscribe(subscription);
        }
        if !options.keep_on_map {
            self.detach(layer);
        }
        tracing::debug!("Removed {:?} from the chooser", entry.name);
        Some(entry)
    }

    pub fn find<'a>(&self, key: impl Into<LayerRef<'a>>) -> Option<&LayerEntry> {
        self.registry.find(key)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.registry.find(name).map(|e| e.layer)
    }

    pub fn set_label<'a>(&mut self, key: impl Into<LayerRef<'a>>, label: Option<&str>) -> bool {
        self.registry.set_label(key, label)
    }

    pub fn is_active<'a>(&self, key: impl Into<LayerRef<'a>>) -> bool {
        self.registry
            .find(key)
            .is_some_and(|e| self.map.has_layer(e.layer))
    }

    pub fn active_base_layer(&self) -> Option<&LayerEntry> {
        self.registry
            .base_layers()
            .find(|e| self.map.has_layer(e.layer))
    }

    /// Stored display state for `name`, or `default` when nothing is stored.
    pub fn is_overlay_displayed(&self, name: &str, default: bool) -> bool {
        self.overlay_status.get(name).copied().unwrap_or(default)
    }

    /// Attaches (`display = true`) or detaches a registered layer. Showing a
    /// base layer first detaches every other base layer.
    ///
    /// Returns `false` if the layer is not registered.
    pub fn show<'a>(&mut self, key: impl Into<LayerRef<'a>>, display: bool) -> bool {
        let key = key.into();
        let Some(entry) = self.registry.find(key) else {
            tracing::warn!("Layer not found: {:?}", key);
            return false;
        };
        let (layer, is_base) = (entry.layer, entry.is_base());
        if !display {
            self.detach(layer);
            return true;
        }
        if !self.map.has_layer(layer) {
            if is_base {
                self.detach_other_base_layers(layer);
            }
            self.attach(layer);
        }
        true
    }

    /// Forwards a membership change that happened on the map outside of the
    /// chooser, e.g. a checkbox toggled by the widget.
    pub fn notify_membership(&mut self, layer: LayerId, attached: bool) {
        if attached && self.registry.find(layer).is_some_and(LayerEntry::is_base) {
            self.detach_other_base_layers(layer);
        }
        self.dispatch(layer, attached);
    }

    fn detach_other_base_layers(&mut self, keep: LayerId) {
        let others: Vec<LayerId> = self
            .registry
            .base_layers()
            .map(|e| e.layer)
            .filter(|l| *l != keep)
            .collect();
        for other in others {
            self.detach(other);
        }
    }

    /// Adds `member` to the internal layer set of `composite`. If the
    /// composite is on the map, the member is attached as well.
    pub fn composite_insert(&mut self, composite: LayerId, member: LayerId) {
        let members = self.composites.entry(composite).or_default();
        if members.contains(&member) {
            return;
        }
        members.push(member);
        if self.map.has_layer(composite) {
            self.attach(member);
        }
    }

    pub fn composite_members(&self, composite: LayerId) -> &[LayerId] {
        self.composites
            .get(&composite)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Empties a composite's layer set without touching the map.
    pub fn composite_clear(&mut self, composite: LayerId) -> Vec<LayerId> {
        self.composites.remove(&composite).unwrap_or_default()
    }

    /// Attaches `layer` (and composite members); returns whether the layer
    /// itself was newly attached.
    pub(crate) fn attach(&mut self, layer: LayerId) -> bool {
        let changed = self.map.add_layer(layer);
        if changed {
            self.dispatch(layer, true);
        }
        for member in self.composite_members(layer).to_vec() {
            self.attach(member);
        }
        changed
    }

    pub(crate) fn detach(&mut self, layer: LayerId) -> bool {
        let changed = self.map.remove_layer(layer);
        if changed {
            self.dispatch(layer, false);
        }
        for member in self.composite_members(layer).to_vec() {
            self.detach(member);
        }
        changed
    }

    fn subscribe(&mut self, tracker: Tracker) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.trackers.insert(subscription, tracker);
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.trackers.remove(&subscription);
    }

    fn dispatch(&mut self, layer: LayerId, attached: bool) {
        let fired: Vec<Tracker> = self
            .trackers
            .values()
            .filter(|t| t.layer() == layer)
            .cloned()
            .collect();
        for tracker in fired {
            match tracker {
                Tracker::OverlayStatus { name, .. } => self.record_overlay_state(&name, attached),
                Tracker::BaseSelection { name, .. } if attached => self.record_base_layer(&name),
                Tracker::BaseSelection { .. } => {}
            }
        }
    }

    fn record_overlay_state(&mut self, name: &str, displayed: bool) {
        self.overlay_status.insert(name.to_string(), displayed);
        if let Err(e) = self.store.save_overlay_status(&self.overlay_status) {
            tracing::error!("Failed to store state of overlay {:?}: {:#}", name, e);
        }
    }

    fn record_base_layer(&mut self, name: &str) {
        if let Err(e) = self.store.save_base_layer(name) {
            tracing::error!("Failed to store base layer {:?}: {:#}", name, e);
        }
    }

    /// Base layers and overlays with plain-text labels and their current
    /// state, indexed by render position.
    pub fn layers_summary(&self) -> LayerSummary {
        let mut summary = LayerSummary::default();
        for (index, entry) in self.registry.entries().iter().enumerate() {
            let item = LayerSummaryItem {
                layer_id: index,
                name: strip_markup(&entry.label),
                active: self.map.has_layer(entry.layer),
            };
            if entry.overlay {
                summary.overlay_layers.push(item);
            } else {
                summary.base_layers.push(item);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BASE_LAYER_KEY, OVERLAY_STATUS_KEY};
    use crate::map::LayerMap;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn chooser(store: &MemoryStore) -> LayerChooser<LayerMap, MemoryStore> {
        LayerChooser::new(LayerMap::new(), store.clone(), &ChooserConfig::default())
    }

    fn stored(store: &MemoryStore) -> OverlayStatusMap {
        LayerStateStore::from_config(store.clone(), &ChooserConfig::default()).load_overlay_status()
    }

    #[test]
    fn test_only_one_base_layer_is_attached() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let layers: Vec<LayerId> = (0..4).map(|_| LayerId::next()).collect();
        for (i, layer) in layers.iter().enumerate() {
            chooser.add_base_layer(*layer, &format!("Base {i}"), LayerOptions::new());
        }

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let target = layers[rng.random_range(0..layers.len())];
            chooser.show(target, rng.random_bool(0.8));
            let attached = layers.iter().filter(|l| chooser.map().has_layer(**l)).count();
            assert!(attached <= 1, "{} base layers attached", attached);
        }
    }

    #[test]
    fn test_base_layer_selection_is_recorded() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let roads = LayerId::next();
        let dark = LayerId::next();
        chooser.add_base_layer(roads, "Roads", LayerOptions::new().enable(true));
        chooser.add_base_layer(dark, "Dark", LayerOptions::new());
        assert_eq!(store.get(BASE_LAYER_KEY).as_deref(), Some("Roads"));

        chooser.show("Dark", true);
        assert_eq!(store.get(BASE_LAYER_KEY).as_deref(), Some("Dark"));
        assert!(!chooser.map().has_layer(roads));
        assert_eq!(chooser.active_base_layer().map(|e| e.layer), Some(dark));
    }

    #[test]
    fn test_overlay_membership_is_persisted() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let fields = LayerId::next();
        chooser.add_overlay(fields, "Fields", LayerOptions::new());
        assert!(chooser.map().has_layer(fields));
        assert_eq!(stored(&store).get("Fields"), Some(&true));

        chooser.show("Fields", false);
        assert_eq!(stored(&store).get("Fields"), Some(&false));
        chooser.show(fields, true);
        assert_eq!(stored(&store).get("Fields"), Some(&true));
    }

    #[test]
    fn test_stored_state_beats_default() {
        let store = MemoryStore::with_entries([(
            OVERLAY_STATUS_KEY,
            r#"{"Links": false, "Fields": true}"#,
        )]);
        let mut chooser = chooser(&store);
        let links = LayerId::next();
        let fields = LayerId::next();
        chooser.add_overlay(links, "Links", LayerOptions::new());
        chooser.add_overlay(fields, "Fields", LayerOptions::new().default_state(false));
        assert!(!chooser.map().has_layer(links));
        assert!(chooser.map().has_layer(fields));
    }

    #[test]
    fn test_explicit_enable_overrides_store() {
        let store = MemoryStore::with_entries([(OVERLAY_STATUS_KEY, r#"{"Links": false}"#)]);
        let mut chooser = chooser(&store);
        let links = LayerId::next();
        chooser.add_overlay(links, "Links", LayerOptions::new().enable(true));
        assert!(chooser.map().has_layer(links));
        assert_eq!(stored(&store).get("Links"), Some(&true));
    }

    #[test]
    fn test_layer_already_on_map_is_recorded_as_on() {
        let store = MemoryStore::with_entries([(OVERLAY_STATUS_KEY, r#"{"Links": false}"#)]);
        let mut map = LayerMap::new();
        let links = LayerId::next();
        map.add_layer(links);
        let mut chooser = LayerChooser::new(map, store.clone(), &ChooserConfig::default());

        chooser.add_overlay(links, "Links", LayerOptions::new());
        assert!(chooser.map().has_layer(links));
        assert_eq!(stored(&store).get("Links"), Some(&true));
    }

    #[test]
    fn test_non_persistent_overlay_never_touches_store() {
        let store = MemoryStore::with_entries([(OVERLAY_STATUS_KEY, r#"{"Scratch": true}"#)]);
        let mut chooser = chooser(&store);
        let scratch = LayerId::next();
        chooser.add_overlay(
            scratch,
            "Scratch",
            LayerOptions::new().persistent(false).default_state(false),
        );
        assert!(!chooser.map().has_layer(scratch));
        assert!(chooser.find(scratch).unwrap().tracking_handle().is_none());

        chooser.show(scratch, true);
        chooser.show(scratch, false);
        assert_eq!(stored(&store).get("Scratch"), Some(&true));
    }

    #[test]
    fn test_remove_disposes_tracking() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let beacons = LayerId::next();
        chooser.add_overlay(beacons, "Beacons", LayerOptions::new().enable(true));
        assert!(chooser.find(beacons).unwrap().tracking_handle().is_some());

        let removed = chooser.remove_layer("Beacons", RemoveOptions::keep_on_map()).unwrap();
        assert!(removed.tracking_handle().is_none());
        assert!(chooser.map().has_layer(beacons));

        // no longer tracked: detaching does not reach the store
        chooser.notify_membership(beacons, false);
        assert_eq!(stored(&store).get("Beacons"), Some(&true));
    }

    #[test]
    fn test_remove_detaches_by_default() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let beacons = LayerId::next();
        chooser.add_overlay(beacons, "Beacons", LayerOptions::new());
        chooser.remove_layer(beacons, RemoveOptions::default()).unwrap();
        assert!(!chooser.map().has_layer(beacons));
        assert!(chooser.find(beacons).is_none());
        assert!(chooser.remove_layer(beacons, RemoveOptions::default()).is_none());
    }

    #[test]
    fn test_removal_leaves_stored_state_alone() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let beacons = LayerId::next();
        let drawn = LayerId::next();
        chooser.add_overlay(beacons, "Beacons", LayerOptions::new());
        chooser.add_overlay(drawn, "Drawn Items", LayerOptions::new());
        assert_eq!(stored(&store).get("Drawn Items"), Some(&true));

        chooser.remove_layer(beacons, RemoveOptions::default()).unwrap();
        crate::legacy::remove_layer_group(&mut chooser, drawn).unwrap();
        assert!(!chooser.map().has_layer(drawn));
        assert_eq!(stored(&store).get("Beacons"), Some(&true));
        assert_eq!(stored(&store).get("Drawn Items"), Some(&true));

        // next session brings it back as the user left it
        let mut next = LayerChooser::new(LayerMap::new(), store.clone(), &ChooserConfig::default());
        next.add_overlay(drawn, "Drawn Items", LayerOptions::new().default_state(false));
        assert!(next.map().has_layer(drawn));
    }

    #[test]
    fn test_show_unknown_layer_is_noop() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        assert!(!chooser.show("Nothing", true));
        assert!(!chooser.show(5usize, false));
        assert!(store.is_empty());
    }

    #[test]
    fn test_index_and_name_address_same_entry() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let hidden = |priority| LayerOptions::new().sort_priority(priority).enable(false);
        chooser.add_overlay(LayerId::next(), "Late", hidden(50));
        chooser.add_overlay(LayerId::next(), "Early", hidden(-50));

        let index = chooser.registry().position("Late").unwrap();
        assert_eq!(index, 1);
        chooser.show(index, true);
        assert!(chooser.is_active("Late"));
        assert!(!chooser.is_active("Early"));
    }

    #[test]
    fn test_external_base_attach_enforces_exclusion() {
        let store = MemoryStore::new();
        let mut map = LayerMap::new();
        let a = LayerId::next();
        let b = LayerId::next();
        map.add_layer(a);
        map.add_layer(b);
        let mut chooser = LayerChooser::new(map, store.clone(), &ChooserConfig::default());
        chooser.add_base_layer(a, "A", LayerOptions::new());
        chooser.add_base_layer(b, "B", LayerOptions::new());

        chooser.notify_membership(b, true);
        assert!(!chooser.map().has_layer(a));
        assert_eq!(store.get(BASE_LAYER_KEY).as_deref(), Some("B"));
    }

    #[test]
    fn test_composite_cascades_membership() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        let group = LayerId::next();
        let member = LayerId::next();
        chooser.composite_insert(group, member);
        assert!(!chooser.map().has_layer(member));

        chooser.add_overlay(group, "Group", LayerOptions::new().persistent(false));
        assert!(chooser.map().has_layer(member));
        chooser.show(group, false);
        assert!(!chooser.map().has_layer(member));

        assert_eq!(chooser.composite_clear(group), vec![member]);
        chooser.show(group, true);
        assert!(!chooser.map().has_layer(member));
    }

    #[test]
    fn test_summary_strips_markup() {
        let store = MemoryStore::new();
        let mut chooser = chooser(&store);
        chooser.add_base_layer(LayerId::next(), "Map", LayerOptions::new().enable(true));
        chooser.add_overlay(
            LayerId::next(),
            "<i>Portals [2]</i>",
            LayerOptions::new().enable(false),
        );

        let summary = chooser.layers_summary();
        assert_eq!(summary.base_layers.len(), 1);
        assert!(summary.base_layers[0].active);
        assert_eq!(summary.overlay_layers[0].name, "Portals [2]");
        assert_eq!(summary.overlay_layers[0].layer_id, 1);
        assert!(!summary.overlay_layers[0].active);
    }
}
