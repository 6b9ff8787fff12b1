//! Collapsible layer groups.
//!
//! A group gathers the overlays whose names end with one of its suffixes and
//! can replace them in the chooser with a single synthetic overlay. Members
//! keep their map state while collapsed: enabled members render inside the
//! group, disabled ones are remembered and reported in the group's label.
//! Expanding registers every member again with exactly the state it has at
//! that moment.
//!
//! A layer belonging to two groups at once is not supported; the outcome of
//! collapsing both is undefined.

use crate::chooser::LayerChooser;
use crate::models::layer::{LayerId, LayerOptions, RemoveOptions};
use crate::store::KeyValueStore;
use crate::traits::MapSurface;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOptions {
    /// Name of the synthetic entry.
    pub name: String,
    /// Overlays whose names end with any of these are members.
    pub suffixes: Vec<String>,
    pub sort_priority: Option<i32>,
    pub persistent: bool,
    /// Overlays whose long-press toggles the group.
    pub bind_to: Vec<String>,
}

impl GroupOptions {
    /// Group named `name`, matching overlays whose names end with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        GroupOptions {
            suffixes: vec![name.clone()],
            name,
            sort_priority: None,
            persistent: true,
            bind_to: Vec::new(),
        }
    }

    pub fn with_suffixes<I, T>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_priority(mut self, priority: i32) -> Self {
        self.sort_priority = Some(priority);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn bind_to<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.bind_to.extend(names.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMember {
    pub layer: LayerId,
    /// Label to restore when the member is registered again.
    pub label: String,
}

#[derive(Debug)]
pub struct GroupingAdapter {
    layer: LayerId,
    options: GroupOptions,
    members: Vec<GroupMember>,
    disabled: Vec<LayerId>,
    expand_armed: bool,
}

impl GroupingAdapter {
    /// Creates the group and picks up the currently registered overlays
    /// matching `options.suffixes`.
    pub fn new<M: MapSurface, S: KeyValueStore>(
        chooser: &LayerChooser<M, S>,
        options: GroupOptions,
    ) -> Self {
        let mut group = GroupingAdapter {
            layer: LayerId::next(),
            options,
            members: Vec::new(),
            disabled: Vec::new(),
            expand_armed: false,
        };
        for suffix in group.options.suffixes.clone() {
            group.add_members(chooser, &suffix);
        }
        group
    }

    /// Adds registered overlays whose names end with `suffix`.
    pub fn add_members<M: MapSurface, S: KeyValueStore>(
        &mut self,
        chooser: &LayerChooser<M, S>,
        suffix: &str,
    ) -> &mut Self {
        let matches: Vec<GroupMember> = chooser
            .registry()
            .overlays()
            .filter(|e| e.layer != self.layer && e.name.ends_with(suffix))
            .map(|e| GroupMember {
                layer: e.layer,
                label: e.label.clone(),
            })
            .collect();
        if matches.is_empty() {
            tracing::warn!("No overlays match {:?} for group {:?}", suffix, self.options.name);
        }
        for member in matches {
            if !self.members.iter().any(|m| m.layer == member.layer) {
                self.members.push(member);
            }
        }
        self
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }

    pub fn is_expand_armed(&self) -> bool {
        self.expand_armed
    }

    pub fn is_bound_to(&self, name: &str) -> bool {
        self.options.bind_to.iter().any(|n| n == name)
    }

    pub fn is_collapsed<M: MapSurface, S: KeyValueStore>(
        &self,
        chooser: &LayerChooser<M, S>,
    ) -> bool {
        chooser.registry().contains(self.layer)
    }

    /// Label for the collapsed entry: the plain name, or the name with the
    /// number of disabled members in italics.
    pub fn label(&self) -> String {
        if self.disabled.is_empty() {
            self.options.name.clone()
        } else {
            format!("<i>{} [{}]</i>", self.options.name, self.disabled.len())
        }
    }

    /// Replaces the members in the chooser with the single group entry.
    pub fn collapse<M: MapSurface, S: KeyValueStore>(&mut self, chooser: &mut LayerChooser<M, S>) {
        if self.is_collapsed(chooser) {
            tracing::warn!("Group {:?} is already collapsed", self.options.name);
            return;
        }
        self.disabled.clear();

        for member in &mut self.members {
            if let Some(entry) = chooser.find(member.layer) {
                member.label = entry.label.clone();
            }
            chooser.remove_layer(member.layer, RemoveOptions::keep_all());
            if chooser.map().has_layer(member.layer) {
                chooser.composite_insert(self.layer, member.layer);
            } else {
                self.disabled.push(member.layer);
            }
        }

        // nothing enabled: keep everything inside a disabled group
        let all_disabled = !self.members.is_empty() && self.disabled.len() == self.members.len();
        if all_disabled {
            for layer in std::mem::take(&mut self.disabled) {
                chooser.composite_insert(self.layer, layer);
            }
        }

        let mut options = LayerOptions::new()
            .name(self.options.name.clone())
            .persistent(self.options.persistent)
            .enable(!all_disabled);
        options.sort_priority = self.options.sort_priority;
        chooser.add_overlay(self.layer, &self.label(), options);
        self.expand_armed = true;

        tracing::debug!(
            "Collapsed {} layers into {:?} ({} disabled)",
            self.members.len(),
            self.options.name,
            self.disabled.len()
        );
    }

    /// Registers every member again with its current map state and drops the
    /// group entry.
    pub fn expand<M: MapSurface, S: KeyValueStore>(&mut self, chooser: &mut LayerChooser<M, S>) {
        if !self.is_collapsed(chooser) {
            tracing::warn!("Group {:?} is not collapsed", self.options.name);
            return;
        }
        for member in &self.members {
            let attached = chooser.map().has_layer(member.layer);
            chooser.add_overlay(member.layer, &member.label, LayerOptions::new().enable(attached));
        }
        chooser.composite_clear(self.layer);
        chooser.remove_layer(self.layer, RemoveOptions::default());
        self.disabled.clear();
        self.expand_armed = false;

        tracing::debug!("Expanded {:?}", self.options.name);
    }

    /// Collapses or expands; without an explicit direction, expands when the
    /// group entry is registered and collapses otherwise.
    pub fn toggle<M: MapSurface, S: KeyValueStore>(
        &mut self,
        chooser: &mut LayerChooser<M, S>,
        collapse: Option<bool>,
    ) {
        let collapse = collapse.unwrap_or_else(|| !self.is_collapsed(chooser));
        if collapse {
            self.collapse(chooser);
        } else {
            self.expand(chooser);
        }
    }

    /// Turns on the members that were disabled when the group collapsed and
    /// restores the plain label. Returns `false` if there was nothing to do.
    pub fn enable_all<M: MapSurface, S: KeyValueStore>(
        &mut self,
        chooser: &mut LayerChooser<M, S>,
    ) -> bool {
        if !self.is_collapsed(chooser) || self.disabled.is_empty() {
            return false;
        }
        for layer in std::mem::take(&mut self.disabled) {
            chooser.attach(layer);
            chooser.composite_insert(self.layer, layer);
        }
        chooser.set_label(self.layer, None);
        true
    }
}
