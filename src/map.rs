use crate::models::layer::LayerId;
use crate::traits::MapSurface;

/// In-memory map surface: remembers which layers are attached, in attach
/// order (topmost last).
#[derive(Debug, Clone, Default)]
pub struct LayerMap {
    attached: Vec<LayerId>,
}

impl LayerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[LayerId] {
        &self.attached
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

impl MapSurface for LayerMap {
    fn has_layer(&self, layer: LayerId) -> bool {
        self.attached.contains(&layer)
    }

    fn add_layer(&mut self, layer: LayerId) -> bool {
        if self.has_layer(layer) {
            return false;
        }
        self.attached.push(layer);
        true
    }

    fn remove_layer(&mut self, layer: LayerId) -> bool {
        let before = self.attached.len();
        self.attached.retain(|l| *l != layer);
        self.attached.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_changes_are_idempotent() {
        let mut map = LayerMap::new();
        let layer = LayerId::next();
        assert!(map.add_layer(layer));
        assert!(!map.add_layer(layer));
        assert_eq!(map.len(), 1);
        assert!(map.remove_layer(layer));
        assert!(!map.remove_layer(layer));
        assert!(map.is_empty());
    }
}
