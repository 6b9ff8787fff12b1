//! Exclusive overlay toggle ("solo").
//!
//! Nothing is stored between presses: every run looks at which eligible
//! overlays are currently on the map. Pressing an overlay while others are
//! visible isolates it; pressing it again while it is the only visible one
//! (or when nothing is visible) brings back every overlay that is on by
//! default.

use crate::chooser::LayerChooser;
use crate::models::layer::{LayerEntry, LayerId};
use crate::store::KeyValueStore;
use crate::traits::MapSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoloOutcome {
    /// The index did not resolve to an overlay.
    Rejected,
    /// Default-enabled overlays were attached again.
    RestoredDefaults,
    /// The target is now the only eligible overlay on the map.
    Isolated,
}

impl<M: MapSurface, S: KeyValueStore> LayerChooser<M, S> {
    /// Whether the solo gesture may attach or detach this entry.
    pub fn is_solo_eligible(&self, entry: &LayerEntry) -> bool {
        entry.overlay && !self.solo_exclusions.iter().any(|name| *name == entry.name)
    }

    /// Runs the solo gesture for the overlay at render position `index`.
    pub fn toggle_overlay(&mut self, index: usize) -> SoloOutcome {
        let Some(target) = self.registry.entries().get(index).filter(|e| e.overlay) else {
            tracing::warn!("Overlay not found at index {}", index);
            return SoloOutcome::Rejected;
        };
        let target = target.layer;

        let eligible: Vec<(LayerId, bool)> = self
            .registry
            .entries()
            .iter()
            .filter(|e| self.is_solo_eligible(e))
            .map(|e| (e.layer, e.default_state))
            .collect();
        let checked = eligible
            .iter()
            .filter(|(layer, _)| self.map.has_layer(*layer))
            .count();
        let is_target_checked = self.map.has_layer(target);

        if checked == 0 || (is_target_checked && checked == 1) {
            for (layer, default_state) in eligible {
                if default_state {
                    self.attach(layer);
                }
            }
            tracing::debug!("Restored default overlays");
            SoloOutcome::RestoredDefaults
        } else {
            for (layer, _) in eligible {
                if layer == target {
                    self.attach(layer);
                } else {
                    self.detach(layer);
                }
            }
            tracing::debug!("Isolated overlay at index {}", index);
            SoloOutcome::Isolated
        }
    }
}
