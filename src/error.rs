use crate::signal::SignalKey;

/// Failures along the restart hand-off path. None of these are fatal: they
/// are logged where they happen and the restart or startup carries on.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("restart rejected by requester")]
    UserRejected,
    #[error("restart confirmation timed out after {0}s")]
    Timeout(u64),
    #[error("failed to persist {key}: {source:#}")]
    PersistenceFailure {
        key: SignalKey,
        #[source]
        source: anyhow::Error,
    },
    #[error("resume record is corrupt: {0}")]
    ResumeRecordCorrupt(#[from] serde_json::Error),
    #[error("no reachable channel for platform '{0}'")]
    EndpointUnresolvable(String),
}

impl HandoffError {
    pub fn persistence(key: SignalKey, source: anyhow::Error) -> Self {
        Self::PersistenceFailure { key, source }
    }
}

/// Why a restart request did not go ahead.
#[derive(Debug, thiserror::Error)]
pub enum RebootError {
    #[error("another restart is already in progress")]
    AlreadyPending,
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error("channel error: {0:#}")]
    Channel(#[source] anyhow::Error),
}
