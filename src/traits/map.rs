use crate::models::layer::LayerId;

/// The map the chooser attaches layers to.
///
/// `add_layer` and `remove_layer` report whether membership actually
/// changed; attaching an attached layer (or detaching a detached one) must
/// return `false` so no second notification is produced.
pub trait MapSurface {
    fn has_layer(&self, layer: LayerId) -> bool;
    fn add_layer(&mut self, layer: LayerId) -> bool;
    fn remove_layer(&mut self, layer: LayerId) -> bool;
}
