use super::signal::RebootSignal;
use crate::channels::ConversationRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What the dying process leaves behind for its successor: who asked for the
/// restart, where, when, and with which options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    /// Copy of the `signal` key, so the report does not depend on it.
    pub signal: RebootSignal,
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Epoch millis at confirmation time
    pub requested_at_ms: i64,
    pub origin_platform: String,
    pub origin_channel: String,
    pub origin_user: String,
}

impl ResumeRecord {
    pub fn new(signal: RebootSignal, origin: &ConversationRef, requested_at_ms: i64) -> Self {
        Self {
            signal,
            options: Map::new(),
            requested_at_ms,
            origin_platform: origin.platform.clone(),
            origin_channel: origin.channel_id.clone(),
            origin_user: origin.user_id.clone(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn origin(&self) -> ConversationRef {
        ConversationRef::new(&self.origin_platform, &self.origin_channel, &self.origin_user)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
