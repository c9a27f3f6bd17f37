use async_trait::async_trait;

/// Well-known keys shared between the process that exits and the one that
/// starts next. The string forms are part of the on-disk layout and must not
/// change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKey {
    /// Decimal text of the restart bitmask.
    Signal,
    /// Raw diagnostics captured before exit.
    CommandLogs,
    /// JSON resume record.
    LastSession,
    /// JSON snapshot of the conversation ring buffer.
    HistoryRecords,
}

impl SignalKey {
    pub const ALL: [SignalKey; 4] = [
        SignalKey::Signal,
        SignalKey::CommandLogs,
        SignalKey::LastSession,
        SignalKey::HistoryRecords,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::CommandLogs => "command_cmdlogs",
            Self::LastSession => "command_lastsession",
            Self::HistoryRecords => "history_records",
        }
    }
}

impl std::fmt::Display for SignalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key-value store for small text blobs that must survive a process
/// restart.
///
/// `read` never fails: a missing, unreadable or blank entry is reported as
/// `None`, which callers treat as "nothing pending". Keys are independent; a
/// crash between two writes leaves each key either old or new, never torn.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Replace the value stored under `key`
    async fn write(&self, key: SignalKey, text: &str) -> anyhow::Result<()>;

    /// Read the value stored under `key`, if any
    async fn read(&self, key: SignalKey) -> Option<String>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn clear(&self, key: SignalKey) -> anyhow::Result<()>;
}
