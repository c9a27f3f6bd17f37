//! Durable signal store: the hand-off channel between a process that is about
//! to exit and the instance that replaces it.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileSignalStore;
pub use memory::MemorySignalStore;
pub use traits::{SignalKey, SignalStore};

use crate::config::StoreConfig;
use std::path::Path;
use std::sync::Arc;

/// Factory: build the configured store, resolving a relative directory against
/// `base_dir` (normally the process working directory).
pub fn create_store(config: &StoreConfig, base_dir: &Path) -> anyhow::Result<Arc<dyn SignalStore>> {
    match config.backend.as_str() {
        "file" => {
            let dir = if config.dir.is_absolute() {
                config.dir.clone()
            } else {
                base_dir.join(&config.dir)
            };
            Ok(Arc::new(FileSignalStore::with_prefix(&dir, &config.file_prefix)))
        }
        "memory" => Ok(Arc::new(MemorySignalStore::new())),
        other => anyhow::bail!("Unknown signal store backend '{other}' (expected 'file' or 'memory')"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn factory_builds_known_backends() {
        let base = PathBuf::from("/tmp");
        let mut config = StoreConfig::default();
        assert_eq!(create_store(&config, &base).unwrap().name(), "file");

        config.backend = "memory".into();
        assert_eq!(create_store(&config, &base).unwrap().name(), "memory");
    }

    #[test]
    fn factory_rejects_unknown_backend() {
        let config = StoreConfig {
            backend: "redis".into(),
            ..StoreConfig::default()
        };
        let err = create_store(&config, Path::new("."))
            .err()
            .expect("unknown backend should fail");
        assert!(err.to_string().contains("redis"));
    }
}
