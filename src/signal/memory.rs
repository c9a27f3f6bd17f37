use super::traits::{SignalKey, SignalStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-process signal store. Same contract as the file backend, but nothing
/// outlives the value; share it through an `Arc` to simulate a restart.
#[derive(Default)]
pub struct MemorySignalStore {
    entries: Mutex<HashMap<SignalKey, String>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: SignalKey) -> bool {
        self.entries.lock().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, key: SignalKey, text: &str) -> anyhow::Result<()> {
        self.entries.lock().insert(key, text.to_string());
        Ok(())
    }

    async fn read(&self, key: SignalKey) -> Option<String> {
        self.entries
            .lock()
            .get(&key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    async fn clear(&self, key: SignalKey) -> anyhow::Result<()> {
        self.entries.lock().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn behaves_like_file_store() {
        let store = MemorySignalStore::new();
        assert!(store.is_empty());

        store.write(SignalKey::Signal, " 5 \n").await.unwrap();
        assert_eq!(store.read(SignalKey::Signal).await.as_deref(), Some("5"));
        assert!(store.contains(SignalKey::Signal));

        store.write(SignalKey::CommandLogs, "   ").await.unwrap();
        assert!(store.read(SignalKey::CommandLogs).await.is_none());

        store.clear(SignalKey::Signal).await.unwrap();
        store.clear(SignalKey::Signal).await.unwrap();
        assert!(!store.contains(SignalKey::Signal));
        assert_eq!(store.len(), 1);
    }
}
