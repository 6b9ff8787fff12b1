pub mod bridge;
pub mod chooser;
pub mod config;
pub mod control;
pub mod group;
pub mod legacy;
pub mod map;
pub mod models;
pub mod registry;
pub mod solo;
pub mod store;
pub mod traits;
pub mod utils;

pub use bridge::{DebouncedBridge, HostBridge};
pub use chooser::LayerChooser;
pub use config::{ChooserConfig, StoreSource};
pub use control::{InputEvent, Interaction, LayerControl, ListenerHandle, LongPressEvent};
pub use group::{GroupOptions, GroupingAdapter};
pub use map::LayerMap;
pub use models::layer::{LayerEntry, LayerId, LayerOptions, LayerRef, RemoveOptions};
pub use models::summary::{LayerSummary, LayerSummaryItem};
pub use registry::LayerRegistry;
pub use solo::SoloOutcome;
pub use store::{KeyValueStore, LayerStateStore, LocalStore, MemoryStore};
pub use traits::MapSurface;
