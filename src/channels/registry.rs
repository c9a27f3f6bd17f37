use super::traits::Channel;
use std::collections::HashMap;
use std::sync::Arc;

/// Live adapters by platform name. Built once at startup; the resume reporter
/// uses it to find the adapter that should carry the post-restart report.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `channel` under its own name, replacing any previous adapter.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        if self.channels.insert(name.clone(), channel).is_some() {
            tracing::warn!(platform = %name, "Replacing already registered channel");
        }
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn Channel>> {
        self.channels.get(platform).cloned()
    }

    /// Like [`get`](Self::get), but only returns adapters passing their
    /// health check.
    pub async fn resolve(&self, platform: &str) -> Option<Arc<dyn Channel>> {
        let channel = self.get(platform)?;
        if channel.health_check().await {
            Some(channel)
        } else {
            tracing::warn!(platform, "Channel failed health check");
            None
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn all(&self) -> Vec<Arc<dyn Channel>> {
        self.channels.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
