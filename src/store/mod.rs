pub mod local;
pub mod memory;
pub mod state;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use state::{LayerStateStore, OverlayStatusMap};

/// String-keyed durable storage, in the spirit of a browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}
