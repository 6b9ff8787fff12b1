//! Free functions kept for callers written against the older, name-based
//! API. They operate on an explicitly passed chooser.

use crate::chooser::LayerChooser;
use crate::models::layer::{LayerId, LayerOptions, RemoveOptions};
use crate::store::KeyValueStore;
use crate::traits::MapSurface;
use anyhow::anyhow;

/// Stored display state of `name`, or `default_display` if none is stored.
pub fn is_layer_group_displayed<M: MapSurface, S: KeyValueStore>(
    chooser: &LayerChooser<M, S>,
    name: &str,
    default_display: bool,
) -> bool {
    chooser.is_overlay_displayed(name, default_display)
}

/// Adds an overlay; `Some(false)` makes it off by default.
pub fn add_layer_group<M: MapSurface, S: KeyValueStore>(
    chooser: &mut LayerChooser<M, S>,
    name: &str,
    layer: LayerId,
    default_display: Option<bool>,
) {
    let mut options = LayerOptions::new();
    if default_display == Some(false) {
        options = options.default_state(false);
    }
    chooser.add_overlay(layer, name, options);
}

/// Removes an overlay from both the chooser and the map.
pub fn remove_layer_group<M: MapSurface, S: KeyValueStore>(
    chooser: &mut LayerChooser<M, S>,
    layer: LayerId,
) -> anyhow::Result<()> {
    chooser
        .remove_layer(layer, RemoveOptions::default())
        .map(|_| ())
        .ok_or_else(|| anyhow!("layer {:?} was not found", layer))
}
