//! The only place that reads or writes the durable store on behalf of the
//! chooser.

use super::KeyValueStore;
use crate::config::ChooserConfig;
use std::collections::BTreeMap;

/// Last known display state of each overlay, keyed by layer name.
pub type OverlayStatusMap = BTreeMap<String, bool>;

#[derive(Debug)]
pub struct LayerStateStore<S> {
    inner: S,
    overlay_key: String,
    base_key: String,
}

impl<S: KeyValueStore> LayerStateStore<S> {
    pub fn new(inner: S, overlay_key: impl Into<String>, base_key: impl Into<String>) -> Self {
        LayerStateStore {
            inner,
            overlay_key: overlay_key.into(),
            base_key: base_key.into(),
        }
    }

    pub fn from_config(inner: S, config: &ChooserConfig) -> Self {
        Self::new(inner, &config.overlay_status_key, &config.base_layer_key)
    }

    /// Reads a JSON record. Absent and unparsable records both yield `None`.
    pub fn load(&self, key: &str) -> Option<serde_json::Value> {
        let raw = self.inner.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Ignoring malformed record {:?}: {}", key, e);
                None
            }
        }
    }

    pub fn save(&mut self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        self.inner.set(key, serde_json::to_string(value)?)
    }

    /// Loads the overlay status record, falling back to an empty map when it
    /// is missing or malformed.
    pub fn load_overlay_status(&self) -> OverlayStatusMap {
        let Some(raw) = self.inner.get(&self.overlay_key) else {
            return OverlayStatusMap::new();
        };
        match serde_json::from_str(&raw) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(
                    "Failed to parse overlay status {:?}, starting empty: {}",
                    self.overlay_key,
                    e
                );
                OverlayStatusMap::new()
            }
        }
    }

    pub fn save_overlay_status(&mut self, status: &OverlayStatusMap) -> anyhow::Result<()> {
        let json = serde_json::to_string(status)?;
        self.inner.set(&self.overlay_key, json)
    }

    /// Drops one overlay's record; returns whether it existed.
    pub fn forget_overlay(&mut self, name: &str) -> anyhow::Result<bool> {
        let mut status = self.load_overlay_status();
        if status.remove(name).is_none() {
            return Ok(false);
        }
        self.save_overlay_status(&status)?;
        Ok(true)
    }

    /// Last active base layer, stored as a plain string.
    pub fn base_layer(&self) -> Option<String> {
        self.inner.get(&self.base_key)
    }

    pub fn save_base_layer(&mut self, name: &str) -> anyhow::Result<()> {
        self.inner.set(&self.base_key, name.to_string())
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.inner.remove(&self.overlay_key)?;
        self.inner.remove(&self.base_key)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}
