use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const OVERLAY_STATUS_KEY: &str = "ingress.intelmap.layergroupdisplayed";
pub const BASE_LAYER_KEY: &str = "iitc-base-map";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSource {
    #[default]
    Memory,
    Local(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChooserConfig {
    pub store: StoreSource,
    pub overlay_status_key: String,
    pub base_layer_key: String,
    /// Overlays the solo gesture never touches.
    pub solo_exclusions: Vec<String>,
    pub initial_priority: i32,
    pub priority_step: i32,
    pub bridge_delay_ms: u64,
}

impl Default for ChooserConfig {
    fn default() -> Self {
        ChooserConfig {
            store: StoreSource::Memory,
            overlay_status_key: OVERLAY_STATUS_KEY.to_string(),
            base_layer_key: BASE_LAYER_KEY.to_string(),
            solo_exclusions: vec![
                "DEBUG Data Tiles".to_string(),
                "Resistance".to_string(),
                "Enlightened".to_string(),
            ],
            initial_priority: -100,
            priority_step: 10,
            bridge_delay_ms: 1000,
        }
    }
}

impl ChooserConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read chooser config from {:?}", path))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("failed to parse chooser config {:?}", path))
    }

    pub fn bridge_delay(&self) -> Duration {
        Duration::from_millis(self.bridge_delay_ms)
    }
}
