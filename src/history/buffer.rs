use super::record::MessageRecord;
use crate::error::HandoffError;
use crate::signal::{SignalKey, SignalStore};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Stands in for a record that could not be serialized. Dropped on restore.
pub const UNSERIALIZABLE_SENTINEL: &str = "[unserializable record]";

/// Bounded per-channel history of recent messages.
///
/// Lives in memory; `flush` writes one JSON snapshot (`channel -> [record]`)
/// through the signal store and `restore_from` reads it back at startup.
/// A single lock covers every channel, so `record` and `snapshot_all` never
/// observe each other half-way.
pub struct ConversationBuffer {
    records_per_channel: usize,
    channels: Mutex<HashMap<String, VecDeque<MessageRecord>>>,
}

impl ConversationBuffer {
    pub fn new(records_per_channel: usize) -> Self {
        Self {
            records_per_channel: records_per_channel.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn records_per_channel(&self) -> usize {
        self.records_per_channel
    }

    /// Append to `channel_id`, evicting the oldest entries past the bound.
    pub fn record(&self, channel_id: &str, record: MessageRecord) {
        let mut channels = self.channels.lock();
        let buffer = channels.entry(channel_id.to_string()).or_default();
        buffer.push_back(record);
        while buffer.len() > self.records_per_channel {
            buffer.pop_front();
        }
    }

    /// Everything buffered for `channel_id`, oldest first.
    pub fn get(&self, channel_id: &str) -> Vec<MessageRecord> {
        self.channels
            .lock()
            .get(channel_id)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `limit` records of `channel_id`, oldest first.
    pub fn recent(&self, channel_id: &str, limit: usize) -> Vec<MessageRecord> {
        let channels = self.channels.lock();
        let Some(buffer) = channels.get(channel_id) else {
            return Vec::new();
        };
        let skip = buffer.len().saturating_sub(limit);
        buffer.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self, channel_id: &str) -> usize {
        self.channels.lock().get(channel_id).map_or(0, VecDeque::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Serialize every channel. Never fails: a record that cannot be encoded
    /// is written as [`UNSERIALIZABLE_SENTINEL`].
    pub fn snapshot_all(&self) -> String {
        let copy: BTreeMap<String, Vec<MessageRecord>> = {
            let channels = self.channels.lock();
            channels
                .iter()
                .map(|(id, buffer)| (id.clone(), buffer.iter().cloned().collect()))
                .collect()
        };

        let mut out = Map::new();
        for (channel_id, records) in copy {
            let values = records
                .iter()
                .map(|record| {
                    serde_json::to_value(record).unwrap_or_else(|e| {
                        tracing::warn!(channel = %channel_id, "Replacing unserializable record: {e}");
                        Value::String(UNSERIALIZABLE_SENTINEL.into())
                    })
                })
                .collect();
            out.insert(channel_id, Value::Array(values));
        }

        serde_json::to_string(&Value::Object(out)).unwrap_or_else(|_| "{}".into())
    }

    /// Replace the whole buffer with `serialized`. A missing or corrupt
    /// snapshot leaves the buffer empty. Returns the number of channels loaded.
    pub fn restore(&self, serialized: Option<&str>) -> usize {
        let restored = serialized.map_or_else(HashMap::new, |raw| self.parse_snapshot(raw));
        let count = restored.len();
        *self.channels.lock() = restored;
        count
    }

    fn parse_snapshot(&self, raw: &str) -> HashMap<String, VecDeque<MessageRecord>> {
        let object = match serde_json::from_str::<Map<String, Value>>(raw) {
            Ok(object) => object,
            Err(e) => {
                tracing::warn!("Discarding corrupt history snapshot: {e}");
                return HashMap::new();
            }
        };

        let mut restored = HashMap::new();
        for (channel_id, value) in object {
            let Value::Array(items) = value else {
                tracing::warn!(channel = %channel_id, "Skipping malformed history channel");
                continue;
            };
            let mut buffer: VecDeque<MessageRecord> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect();
            while buffer.len() > self.records_per_channel {
                buffer.pop_front();
            }
            if !buffer.is_empty() {
                restored.insert(channel_id, buffer);
            }
        }
        restored
    }

    /// Persist the snapshot under [`SignalKey::HistoryRecords`].
    pub async fn flush(&self, store: &dyn SignalStore) -> Result<(), HandoffError> {
        let snapshot = self.snapshot_all();
        store
            .write(SignalKey::HistoryRecords, &snapshot)
            .await
            .map_err(|e| HandoffError::persistence(SignalKey::HistoryRecords, e))?;
        tracing::info!(
            channels = self.channel_count(),
            bytes = snapshot.len(),
            "History snapshot flushed"
        );
        Ok(())
    }

    /// Load the snapshot written by the previous process, if any.
    pub async fn restore_from(&self, store: &dyn SignalStore) -> usize {
        let raw = store.read(SignalKey::HistoryRecords).await;
        let count = self.restore(raw.as_deref());
        tracing::info!(channels = count, "History snapshot restored");
        count
    }
}
