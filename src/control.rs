//! Routes user interaction on the chooser's rows to the chooser, its groups
//! and per-layer long-press listeners, and keeps the host application's copy
//! of the layer list up to date.

use crate::bridge::DebouncedBridge;
use crate::chooser::LayerChooser;
use crate::group::{GroupOptions, GroupingAdapter};
use crate::models::layer::{LayerId, RemoveOptions};
use crate::solo::SoloOutcome;
use crate::store::KeyValueStore;
use crate::traits::MapSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Click,
    TapHold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.meta || self.ctrl || self.shift || self.alt
    }
}

/// The input that reached a chooser row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub modifiers: Modifiers,
}

impl InputEvent {
    pub fn click() -> Self {
        InputEvent {
            kind: InputKind::Click,
            modifiers: Modifiers::default(),
        }
    }

    pub fn tap_hold() -> Self {
        InputEvent {
            kind: InputKind::TapHold,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Tap-hold, or a click with any modifier key held.
    pub fn is_long_press(&self) -> bool {
        self.kind == InputKind::TapHold || self.modifiers.any()
    }
}

/// Raised for a layer before the built-in long-press behaviour runs.
#[derive(Debug)]
pub struct LongPressEvent {
    index: usize,
    layer: LayerId,
    input: InputEvent,
    default_prevented: bool,
}

impl LongPressEvent {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn input(&self) -> InputEvent {
        self.input
    }

    /// Suppresses the solo toggle (or group expansion) for this press.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type LongPressListener = Box<dyn FnMut(&mut LongPressEvent)>;

/// Returned by [`LayerControl::on_long_press`]; pass it to
/// [`LayerControl::off_long_press`] to drop the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// The row index did not resolve to a layer.
    Ignored,
    /// A plain click switched the layer on or off.
    Toggled { attached: bool },
    /// A listener prevented the default behaviour.
    Prevented,
    Solo(SoloOutcome),
    GroupExpanded(usize),
    /// Every group bound to the pressed layer was toggled.
    GroupsToggled(Vec<usize>),
}

pub struct LayerControl<M, S> {
    chooser: LayerChooser<M, S>,
    groups: Vec<GroupingAdapter>,
    listeners: Vec<(ListenerHandle, LayerId, LongPressListener)>,
    next_listener: u64,
    bridge: Option<DebouncedBridge>,
}

impl<M: MapSurface, S: KeyValueStore> LayerControl<M, S> {
    pub fn new(chooser: LayerChooser<M, S>) -> Self {
        LayerControl {
            chooser,
            groups: Vec::new(),
            listeners: Vec::new(),
            next_listener: 1,
            bridge: None,
        }
    }

    pub fn with_bridge(mut self, bridge: DebouncedBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn chooser(&self) -> &LayerChooser<M, S> {
        &self.chooser
    }

    /// Direct access to the chooser. Call [`LayerControl::publish`] after
    /// changes made through it.
    pub fn chooser_mut(&mut self) -> &mut LayerChooser<M, S> {
        &mut self.chooser
    }

    pub fn groups(&self) -> &[GroupingAdapter] {
        &self.groups
    }

    /// Sends the current layer list to the host, if one is attached.
    pub fn publish(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.schedule(self.chooser.layers_summary());
        }
    }

    pub fn on_long_press(
        &mut self,
        layer: LayerId,
        listener: impl FnMut(&mut LongPressEvent) + 'static,
    ) -> ListenerHandle {
        let handle = ListenerHandle(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((handle, layer, Box::new(listener)));
        handle
    }

    /// Drops a listener; returns `false` if it was already gone.
    pub fn off_long_press(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _, _)| *h != handle);
        self.listeners.len() != before
    }

    /// Creates a collapsible group over the currently registered overlays and
    /// returns its index.
    pub fn add_group(&mut self, options: GroupOptions) -> usize {
        let group = GroupingAdapter::new(&self.chooser, options);
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn toggle_group(&mut self, index: usize, collapse: Option<bool>) -> bool {
        let Some(group) = self.groups.get_mut(index) else {
            tracing::warn!("Group not found: {}", index);
            return false;
        };
        group.toggle(&mut self.chooser, collapse);
        self.publish();
        true
    }

    /// Drops the named layers from the chooser while leaving them on the map.
    pub fn hide_from_control<I, T>(&mut self, names: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for name in names {
            self.chooser
                .remove_layer(name.as_ref(), RemoveOptions::keep_on_map());
        }
        self.publish();
    }

    /// Handles a click or tap-hold on the row at `index`.
    pub fn click(&mut self, index: usize, input: InputEvent) -> Interaction {
        if input.is_long_press() {
            return self.long_press(index, input);
        }
        let Some(entry) = self.chooser.find(index) else {
            tracing::warn!("No layer at index {}", index);
            return Interaction::Ignored;
        };
        let (layer, overlay) = (entry.layer, entry.overlay);
        let attached = !overlay || !self.chooser.map().has_layer(layer);
        self.chooser.show(layer, attached);
        self.publish();
        Interaction::Toggled { attached }
    }

    /// Handles a long-press on the row at `index`: listeners first, then an
    /// armed group expansion, then a bound group toggle, then solo.
    pub fn long_press(&mut self, index: usize, input: InputEvent) -> Interaction {
        let Some(entry) = self.chooser.find(index) else {
            tracing::warn!("No layer at index {}", index);
            return Interaction::Ignored;
        };
        let layer = entry.layer;
        let name = entry.name.clone();

        let mut event = LongPressEvent {
            index,
            layer,
            input,
            default_prevented: false,
        };
        for (_, target, listener) in self.listeners.iter_mut() {
            if *target == layer {
                listener(&mut event);
            }
        }
        if event.is_default_prevented() {
            return Interaction::Prevented;
        }

        let bound: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_bound_to(&name))
            .map(|(i, _)| i)
            .collect();

        let interaction = if let Some(i) = self
            .groups
            .iter()
            .position(|g| g.layer() == layer && g.is_expand_armed())
        {
            self.groups[i].expand(&mut self.chooser);
            Interaction::GroupExpanded(i)
        } else if !bound.is_empty() {
            for &i in &bound {
                self.groups[i].toggle(&mut self.chooser, None);
            }
            Interaction::GroupsToggled(bound)
        } else {
            Interaction::Solo(self.chooser.toggle_overlay(index))
        };
        self.publish();
        interaction
    }
}
