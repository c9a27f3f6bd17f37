use super::record::ResumeRecord;
use crate::channels::ChannelRegistry;
use crate::diagnostics::DiagnosticsRenderer;
use crate::error::HandoffError;
use crate::signal::{SignalKey, SignalStore};
use crate::util::{format_elapsed_ms, now_millis};
use std::sync::Arc;

/// What startup found in the store and what it did about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No resume record: the process was started by hand, not by a restart
    ColdStart,
    /// The record could not be parsed; it has been removed
    Corrupt,
    /// The platform the restart came from is not available
    EndpointUnresolvable,
    /// Report sent to the requester
    Delivered,
    /// The adapter was found but the send failed
    SendFailed,
}

/// Runs once at startup: consumes the resume record left by the previous
/// process and tells whoever asked for the restart that it finished.
pub struct ResumeReporter {
    bot_name: String,
    store: Arc<dyn SignalStore>,
    channels: ChannelRegistry,
    renderer: Arc<dyn DiagnosticsRenderer>,
}

impl ResumeReporter {
    pub fn new(
        bot_name: impl Into<String>,
        store: Arc<dyn SignalStore>,
        channels: ChannelRegistry,
        renderer: Arc<dyn DiagnosticsRenderer>,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            store,
            channels,
            renderer,
        }
    }

    pub async fn run(&self) -> ReportOutcome {
        self.run_at(now_millis()).await
    }

    pub async fn run_at(&self, now_ms: i64) -> ReportOutcome {
        let Some(raw) = self.store.read(SignalKey::LastSession).await else {
            tracing::debug!("No resume record, cold start");
            return ReportOutcome::ColdStart;
        };

        // Consume before parsing: a record that crashes us must not be seen twice.
        self.clear(SignalKey::LastSession).await;
        self.clear(SignalKey::Signal).await;

        let record = match ResumeRecord::from_json(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}", HandoffError::from(e));
                self.clear(SignalKey::CommandLogs).await;
                return ReportOutcome::Corrupt;
            }
        };

        let diagnostics = self.take_diagnostics().await;
        let elapsed_ms = now_ms.saturating_sub(record.requested_at_ms);

        let Some(channel) = self.channels.resolve(&record.origin_platform).await else {
            tracing::warn!(
                user = %record.origin_user,
                "{}",
                HandoffError::EndpointUnresolvable(record.origin_platform.clone())
            );
            return ReportOutcome::EndpointUnresolvable;
        };

        let mention = channel.mention(&record.origin_user);
        let report = self.compose(&record, elapsed_ms, &mention, diagnostics.as_deref());
        match channel.send(&report, &record.origin_channel).await {
            Ok(()) => {
                tracing::info!(
                    platform = %record.origin_platform,
                    channel = %record.origin_channel,
                    elapsed = %format_elapsed_ms(elapsed_ms),
                    "Restart report delivered"
                );
                ReportOutcome::Delivered
            }
            Err(e) => {
                tracing::error!(platform = %record.origin_platform, "Failed to send restart report: {e:#}");
                ReportOutcome::SendFailed
            }
        }
    }

    /// Report text. `diagnostics` is already rendered.
    pub fn compose(
        &self,
        record: &ResumeRecord,
        elapsed_ms: i64,
        mention: &str,
        diagnostics: Option<&str>,
    ) -> String {
        format!(
            "{} restart complete ({})\nElapsed: {}\nRequested by: {}\nStartup log: {}",
            self.bot_name,
            record.signal,
            format_elapsed_ms(elapsed_ms),
            mention,
            diagnostics.unwrap_or("-"),
        )
    }

    async fn take_diagnostics(&self) -> Option<String> {
        let raw = self.store.read(SignalKey::CommandLogs).await?;
        self.clear(SignalKey::CommandLogs).await;
        match self.renderer.render(&raw) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                tracing::warn!("Failed to render startup log: {e:#}");
                None
            }
        }
    }

    async fn clear(&self, key: SignalKey) {
        if let Err(e) = self.store.clear(key).await {
            tracing::warn!("{}", HandoffError::persistence(key, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Channel, ChannelMessage, ConversationRef};
    use crate::diagnostics::PreformattedRenderer;
    use crate::reboot::RebootSignal;
    use crate::signal::MemorySignalStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct QqChannel {
        healthy: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl QqChannel {
        fn new(healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                healthy,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Channel for QqChannel {
        fn name(&self) -> &str {
            "qq"
        }
        async fn send(&self, message: &str, recipient: &str) -> anyhow::Result<()> {
            self.sent.lock().push((message.to_string(), recipient.to_string()));
            Ok(())
        }
        async fn listen(&self, _tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn health_check(&self) -> bool {
            self.healthy
        }
        fn mention(&self, user_id: &str) -> String {
            format!("[CQ:at,qq={user_id}]")
        }
    }

    fn reporter(store: Arc<MemorySignalStore>, channel: Option<Arc<QqChannel>>) -> ResumeReporter {
        let mut registry = ChannelRegistry::new();
        if let Some(channel) = channel {
            registry.register(channel);
        }
        ResumeReporter::new("SILI", store, registry, Arc::new(PreformattedRenderer::default()))
    }

    fn record(requested_at_ms: i64) -> ResumeRecord {
        ResumeRecord::new(
            RebootSignal::for_request(false),
            &ConversationRef::new("qq", "group-1", "10001"),
            requested_at_ms,
        )
        .with_option("sync", false)
    }

    async fn seed(store: &MemorySignalStore, record: &ResumeRecord, logs: Option<&str>) {
        store.write(SignalKey::Signal, &record.signal.to_decimal()).await.unwrap();
        store
            .write(SignalKey::LastSession, &record.to_json().unwrap())
            .await
            .unwrap();
        if let Some(logs) = logs {
            store.write(SignalKey::CommandLogs, logs).await.unwrap();
        }
    }

    #[tokio::test]
    async fn cold_start_touches_nothing() {
        let store = Arc::new(MemorySignalStore::new());
        store.write(SignalKey::HistoryRecords, "{}").await.unwrap();
        let channel = QqChannel::new(true);

        let outcome = reporter(store.clone(), Some(channel.clone())).run_at(0).await;

        assert_eq!(outcome, ReportOutcome::ColdStart);
        assert!(channel.sent.lock().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delivers_report_and_consumes_everything() {
        let store = Arc::new(MemorySignalStore::new());
        seed(&store, &record(1_000), Some("$ git pull\nok")).await;
        let channel = QqChannel::new(true);

        let outcome = reporter(store.clone(), Some(channel.clone())).run_at(13_345).await;

        assert_eq!(outcome, ReportOutcome::Delivered);
        let sent = channel.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        let (text, recipient) = &sent[0];
        assert_eq!(recipient, "group-1");
        assert!(text.starts_with("SILI restart complete (000101 reboot|fast)"));
        assert!(text.contains("Elapsed: 12.34s"));
        assert!(text.contains("Requested by: [CQ:at,qq=10001]"));
        assert!(text.contains("```shell\n$ git pull\nok\n```"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_diagnostics_render_as_dash() {
        let store = Arc::new(MemorySignalStore::new());
        seed(&store, &record(5_000), None).await;
        let channel = QqChannel::new(true);

        reporter(store, Some(channel.clone())).run_at(5_000).await;

        let text = channel.sent.lock()[0].0.clone();
        assert!(text.ends_with("Startup log: -"));
        assert!(text.contains("Elapsed: 0.00s"));
    }

    #[tokio::test]
    async fn clock_running_backwards_clamps_to_zero() {
        let store = Arc::new(MemorySignalStore::new());
        seed(&store, &record(10_000), None).await;
        let channel = QqChannel::new(true);

        reporter(store, Some(channel.clone())).run_at(9_000).await;

        assert!(channel.sent.lock()[0].0.contains("Elapsed: 0.00s"));
    }

    #[tokio::test]
    async fn corrupt_record_is_deleted_and_never_reported() {
        let store = Arc::new(MemorySignalStore::new());
        store.write(SignalKey::LastSession, "{\"signal\":5,").await.unwrap();
        store.write(SignalKey::CommandLogs, "stale").await.unwrap();
        let channel = QqChannel::new(true);
        let reporter = reporter(store.clone(), Some(channel.clone()));

        assert_eq!(reporter.run_at(0).await, ReportOutcome::Corrupt);
        assert!(channel.sent.lock().is_empty());
        assert!(!store.contains(SignalKey::LastSession));

        // Second startup sees a clean slate.
        assert_eq!(reporter.run_at(0).await, ReportOutcome::ColdStart);
    }

    #[tokio::test]
    async fn unknown_platform_is_unresolvable_but_record_is_consumed() {
        let store = Arc::new(MemorySignalStore::new());
        seed(&store, &record(0), Some("log")).await;

        let outcome = reporter(store.clone(), None).run_at(0).await;

        assert_eq!(outcome, ReportOutcome::EndpointUnresolvable);
        assert!(!store.contains(SignalKey::LastSession));
        assert!(!store.contains(SignalKey::CommandLogs));
    }

    #[tokio::test]
    async fn unhealthy_platform_is_unresolvable() {
        let store = Arc::new(MemorySignalStore::new());
        seed(&store, &record(0), None).await;
        let channel = QqChannel::new(false);

        let outcome = reporter(store, Some(channel.clone())).run_at(0).await;

        assert_eq!(outcome, ReportOutcome::EndpointUnresolvable);
        assert!(channel.sent.lock().is_empty());
    }
}
