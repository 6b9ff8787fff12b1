//! Pushing the layer list to a host application (e.g. a mobile wrapper).
//!
//! Publishing is coalesced: a burst of changes results in a single push of
//! the latest summary once the chooser has been quiet for the configured
//! delay. None of this is on the chooser's synchronous path.

use crate::models::summary::LayerSummary;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn set_layers(&self, base_layers: String, overlay_layers: String) -> anyhow::Result<()>;
}

/// Removes markup tags from a label and decodes the common entities.
pub fn strip_markup(label: &str) -> String {
    let mut text = String::with_capacity(label.len());
    let mut in_tag = false;
    for c in label.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub struct DebouncedBridge {
    host: Arc<dyn HostBridge>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl DebouncedBridge {
    pub fn new(host: Arc<dyn HostBridge>, delay: Duration) -> Self {
        DebouncedBridge {
            host,
            delay,
            pending: None,
        }
    }

    /// Queues `summary` for delivery, replacing anything still waiting.
    ///
    /// Must be called from within a tokio runtime; outside of one the summary
    /// is dropped with a warning.
    pub fn schedule(&mut self, summary: LayerSummary) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, layer summary not sent to host");
            return;
        };
        let host = self.host.clone();
        let delay = self.delay;
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let (base_layers, overlay_layers) = match summary.to_json_pair() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!("Failed to serialize layer summary: {:#}", e);
                    return;
                }
            };
            if let Err(e) = host.set_layers(base_layers, overlay_layers).await {
                tracing::error!("Host rejected layer summary: {:#}", e);
            }
        }));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }
}

impl Drop for DebouncedBridge {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
