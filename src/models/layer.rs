use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an externally owned layer object.
///
/// The chooser never owns the layers themselves, it only keeps bookkeeping
/// keyed by this handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LayerId(u64);

impl LayerId {
    /// Allocates a fresh, process-unique id.
    pub fn next() -> Self {
        LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

/// Disposable token tying a registry entry to its map-membership tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub(crate) u64);

/// Addresses a registered layer by identity, name or render position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRef<'a> {
    Layer(LayerId),
    Name(&'a str),
    Index(usize),
}

impl From<LayerId> for LayerRef<'_> {
    fn from(layer: LayerId) -> Self {
        LayerRef::Layer(layer)
    }
}

impl<'a> From<&'a str> for LayerRef<'a> {
    fn from(name: &'a str) -> Self {
        LayerRef::Name(name)
    }
}

impl<'a> From<&'a String> for LayerRef<'a> {
    fn from(name: &'a String) -> Self {
        LayerRef::Name(name.as_str())
    }
}

impl From<usize> for LayerRef<'_> {
    fn from(index: usize) -> Self {
        LayerRef::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub layer: LayerId,
    /// Stable identifier, used as the persistence key.
    pub name: String,
    /// Display text; may carry markup.
    pub label: String,
    pub overlay: bool,
    pub sort_priority: i32,
    pub persistent: bool,
    pub default_state: bool,
    pub(crate) tracking: Option<Subscription>,
}

impl LayerEntry {
    pub fn is_base(&self) -> bool {
        !self.overlay
    }

    pub fn tracking_handle(&self) -> Option<Subscription> {
        self.tracking
    }
}

/// Configuration that survives a `keep_data` removal, so the same layer can
/// be re-added later with its behaviour intact.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayerMeta {
    pub name: String,
    pub persistent: bool,
    pub default_state: bool,
    pub sort_priority: i32,
}

/// Options accepted when a layer is added to the chooser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOptions {
    /// Stable name, when it should differ from the display label.
    pub name: Option<String>,
    pub sort_priority: Option<i32>,
    /// Defaults to `true`.
    pub persistent: Option<bool>,
    /// Overlays only; defaults to `true`.
    pub default_state: Option<bool>,
    /// Forces the initial map membership, bypassing stored state.
    pub enable: Option<bool>,
}

impl LayerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sort_priority(mut self, priority: i32) -> Self {
        self.sort_priority = Some(priority);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn default_state(mut self, default_state: bool) -> Self {
        self.default_state = Some(default_state);
        self
    }

    pub fn enable(mut self, enable: bool) -> Self {
        self.enable = Some(enable);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Leave the layer attached to the map surface.
    pub keep_on_map: bool,
    /// Remember the layer's configuration for a later re-add.
    pub keep_data: bool,
}

impl RemoveOptions {
    pub fn keep_on_map() -> Self {
        RemoveOptions {
            keep_on_map: true,
            keep_data: false,
        }
    }

    pub fn keep_all() -> Self {
        RemoveOptions {
            keep_on_map: true,
            keep_data: true,
        }
    }
}
