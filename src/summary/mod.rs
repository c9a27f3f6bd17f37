//! `chat-summary`: ask the completion provider to summarize a channel's
//! buffered history.

use crate::config::SummaryConfig;
use crate::history::{ConversationBuffer, MessageRecord};
use crate::providers::Provider;
use serde::Serialize;
use std::sync::Arc;

/// Prefixes every summary reply. Messages carrying it are never buffered, so
/// one summary cannot feed the next.
pub const SUMMARY_MARKER: &str = "[chat-summary]";

#[derive(Serialize)]
struct SummaryLine<'a> {
    user: &'a str,
    msg: &'a str,
}

pub struct Summarizer {
    history: Arc<ConversationBuffer>,
    provider: Option<Arc<dyn Provider>>,
    config: SummaryConfig,
}

impl Summarizer {
    pub fn new(
        history: Arc<ConversationBuffer>,
        provider: Option<Arc<dyn Provider>>,
        config: SummaryConfig,
    ) -> Self {
        Self {
            history,
            provider,
            config,
        }
    }

    /// Summarize the last `limit` records of `channel_id` (everything
    /// buffered when `None`). Always returns reply text; failures are
    /// reported inline.
    pub async fn summarize(&self, channel_id: &str, limit: Option<usize>) -> String {
        let limit = limit.unwrap_or_else(|| self.history.records_per_channel());
        let records: Vec<MessageRecord> = self
            .history
            .recent(channel_id, limit)
            .into_iter()
            .filter(|r| !r.content.contains(SUMMARY_MARKER))
            .collect();

        if records.len() < self.config.min_records {
            return format!(
                "{SUMMARY_MARKER} too few records to summarize ({} of {} needed)",
                records.len(),
                self.config.min_records
            );
        }

        let Some(provider) = self.provider.as_ref() else {
            return format!("{SUMMARY_MARKER} no completion provider configured");
        };

        let text = match format_records(&records) {
            Ok(text) => text,
            Err(e) => return format!("{SUMMARY_MARKER} failed to format records: {e}"),
        };

        tracing::info!(
            channel = channel_id,
            records = records.len(),
            provider = provider.name(),
            "Requesting chat summary"
        );
        match provider
            .chat_with_system(
                Some(&self.config.prompt),
                &text,
                &self.config.model,
                self.config.temperature,
            )
            .await
        {
            Ok(summary) if summary.trim().is_empty() => {
                format!("{SUMMARY_MARKER} empty response")
            }
            Ok(summary) => format!(
                "{SUMMARY_MARKER} summary of the last {} messages:\n\n{}",
                records.len(),
                summary.trim()
            ),
            Err(e) => {
                tracing::warn!(channel = channel_id, "Chat summary failed: {e:#}");
                format!("{SUMMARY_MARKER} summary failed: {e}")
            }
        }
    }
}

/// `[{"user": ..., "msg": ...}]`, oldest first.
fn format_records(records: &[MessageRecord]) -> serde_json::Result<String> {
    let lines: Vec<SummaryLine<'_>> = records
        .iter()
        .map(|r| SummaryLine {
            user: &r.author,
            msg: &r.content,
        })
        .collect();
    serde_json::to_string(&lines)
}
