use crate::error::HandoffError;
use crate::signal::{SignalKey, SignalStore};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Collects recent operational lines (command transcripts, log events) so
/// the next process can show the requester what happened around a restart.
pub struct DiagnosticsCapture {
    max_lines: usize,
    lines: Mutex<VecDeque<String>>,
}

impl DiagnosticsCapture {
    /// `max_lines == 0` keeps every line until the next flush.
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            lines: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock();
        lines.push_back(line.into());
        if self.max_lines > 0 {
            while lines.len() > self.max_lines {
                lines.pop_front();
            }
        }
    }

    /// Transcript entry for one executed command.
    pub fn record_command(&self, user: &str, conversation: &str, command: &str, duration: Duration, ok: bool) {
        let entry = format!(
            "[{}] {user}@{conversation} $ {command} ({}ms) success={ok}",
            chrono::Utc::now().format("%H:%M:%S"),
            duration.as_millis(),
        );
        self.append(entry);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Drain everything captured so far as one newline-joined blob.
    pub fn take(&self) -> Option<String> {
        let drained: Vec<String> = self.lines.lock().drain(..).collect();
        if drained.is_empty() {
            None
        } else {
            Some(drained.join("\n"))
        }
    }

    /// Write the captured text to [`SignalKey::CommandLogs`] and clear the
    /// buffer. Returns `Ok(false)` when there was nothing to write.
    pub async fn flush(&self, store: &dyn SignalStore) -> Result<bool, HandoffError> {
        let Some(text) = self.take() else {
            return Ok(false);
        };
        store
            .write(SignalKey::CommandLogs, &text)
            .await
            .map_err(|e| HandoffError::persistence(SignalKey::CommandLogs, e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MemorySignalStore;

    #[test]
    fn append_keeps_order() {
        let capture = DiagnosticsCapture::new(0);
        capture.append("one");
        capture.append("two");
        assert_eq!(capture.lines(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn cap_drops_oldest_lines() {
        let capture = DiagnosticsCapture::new(2);
        for line in ["a", "b", "c", "d"] {
            capture.append(line);
        }
        assert_eq!(capture.lines(), vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let capture = DiagnosticsCapture::new(0);
        for i in 0..1000 {
            capture.append(format!("line {i}"));
        }
        assert_eq!(capture.len(), 1000);
    }

    #[test]
    fn record_command_formats_transcript() {
        let capture = DiagnosticsCapture::new(10);
        capture.record_command("alice", "group-1", "reboot --sync", Duration::from_millis(42), true);
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("alice@group-1 $ reboot --sync"));
        assert!(lines[0].contains("42ms"));
        assert!(lines[0].contains("success=true"));
    }

    #[tokio::test]
    async fn flush_writes_verbatim_and_clears() {
        let store = MemorySignalStore::new();
        let capture = DiagnosticsCapture::new(10);
        capture.append("git pull");
        capture.append("Already up to date.");

        assert!(capture.flush(&store).await.unwrap());
        assert!(capture.is_empty());
        assert_eq!(
            store.read(SignalKey::CommandLogs).await.as_deref(),
            Some("git pull\nAlready up to date.")
        );
    }

    #[tokio::test]
    async fn flush_of_empty_capture_writes_nothing() {
        let store = MemorySignalStore::new();
        let capture = DiagnosticsCapture::new(10);
        assert!(!capture.flush(&store).await.unwrap());
        assert!(!store.contains(SignalKey::CommandLogs));
    }
}
