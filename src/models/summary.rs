use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummaryItem {
    /// Position in the chooser's render order.
    #[serde(rename = "layerId")]
    pub layer_id: usize,
    /// Plain-text label, markup stripped.
    pub name: String,
    pub active: bool,
}

/// Snapshot of the chooser, split the way the host application consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerSummary {
    #[serde(rename = "baseLayers")]
    pub base_layers: Vec<LayerSummaryItem>,
    #[serde(rename = "overlayLayers")]
    pub overlay_layers: Vec<LayerSummaryItem>,
}

impl LayerSummary {
    /// Serializes both lists separately, as the host bridge expects them.
    pub fn to_json_pair(&self) -> anyhow::Result<(String, String)> {
        Ok((
            serde_json::to_string(&self.base_layers)?,
            serde_json::to_string(&self.overlay_layers)?,
        ))
    }
}
