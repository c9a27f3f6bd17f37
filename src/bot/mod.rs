//! Message dispatch: record history, answer prompts, run commands.

use crate::channels::{ChannelMessage, ChannelRegistry, ConversationRef, PromptBroker};
use crate::commands::{Authority, Command};
use crate::config::Config;
use crate::diagnostics::DiagnosticsCapture;
use crate::history::{ConversationBuffer, MessageRecord};
use crate::reboot::{RebootCoordinator, RebootRequest};
use crate::summary::{SUMMARY_MARKER, Summarizer};
use crate::util::now_secs;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Bot {
    name: String,
    operators: HashSet<String>,
    trusted: HashSet<String>,
    max_content_chars: usize,
    channels: ChannelRegistry,
    prompts: Arc<PromptBroker>,
    history: Arc<ConversationBuffer>,
    diagnostics: Arc<DiagnosticsCapture>,
    coordinator: Arc<RebootCoordinator>,
    summarizer: Arc<Summarizer>,
}

impl Bot {
    pub fn new(
        config: &Config,
        channels: ChannelRegistry,
        prompts: Arc<PromptBroker>,
        history: Arc<ConversationBuffer>,
        diagnostics: Arc<DiagnosticsCapture>,
        coordinator: Arc<RebootCoordinator>,
        summarizer: Arc<Summarizer>,
    ) -> Self {
        Self {
            name: config.bot.name.clone(),
            operators: config.bot.operators.iter().cloned().collect(),
            trusted: config.bot.trusted.iter().cloned().collect(),
            max_content_chars: config.history.max_content_chars,
            channels,
            prompts,
            history,
            diagnostics,
            coordinator,
            summarizer,
        }
    }

    /// Dispatch until every sender of `rx` is gone.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ChannelMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        tracing::info!("All channels closed, dispatcher stopping");
    }

    /// Handle one inbound message. Commands run on their own task so a
    /// pending confirmation never blocks the next message; the handle is
    /// returned for callers that want to wait on it.
    pub fn handle(self: &Arc<Self>, message: ChannelMessage) -> Option<JoinHandle<()>> {
        if self.prompts.offer(&message) {
            tracing::debug!(user = %message.sender, "Message answered a pending prompt");
            return None;
        }

        if !message.content.contains(SUMMARY_MARKER) {
            self.history.record(
                &message.reply_target,
                MessageRecord::from_message(&message, self.max_content_chars),
            );
        }

        let command = match Command::parse(&message.content)? {
            Ok(command) => command,
            Err(usage) => {
                let bot = Arc::clone(self);
                return Some(tokio::spawn(async move {
                    bot.reply(&message, &usage.to_string()).await;
                }));
            }
        };

        let bot = Arc::clone(self);
        Some(tokio::spawn(async move {
            if !bot.is_authorized(&message.sender, command.authority()) {
                tracing::warn!(user = %message.sender, command = %command, "Permission denied");
                bot.reply(&message, "permission denied").await;
                return;
            }
            bot.execute(command, message).await;
        }))
    }

    /// Restarting always needs a listed operator. History commands are open
    /// to everyone until either list is filled in.
    fn is_authorized(&self, user: &str, authority: Authority) -> bool {
        match authority {
            Authority::Operator => self.operators.contains(user),
            Authority::Trusted => {
                (self.operators.is_empty() && self.trusted.is_empty())
                    || self.operators.contains(user)
                    || self.trusted.contains(user)
            }
        }
    }

    async fn execute(&self, command: Command, message: ChannelMessage) {
        let started = Instant::now();
        let ok = match &command {
            Command::Reboot { sync } => {
                let Some(channel) = self.channels.get(&message.channel) else {
                    tracing::warn!(platform = %message.channel, "Restart requested from unregistered channel");
                    return;
                };
                let request = RebootRequest {
                    origin: ConversationRef::from_message(&message),
                    sync: *sync,
                };
                match self.coordinator.request(request, channel.as_ref()).await {
                    Ok(outcome) => {
                        tracing::debug!(?outcome, "Restart request finished");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(user = %message.sender, "Restart request failed: {e}");
                        false
                    }
                }
            }
            Command::ChatSummary { limit, channel } => {
                let target = channel.as_deref().unwrap_or(&message.reply_target);
                let text = self.summarizer.summarize(target, *limit).await;
                self.reply(&message, &text).await
            }
        };

        self.diagnostics.record_command(
            &message.sender,
            &message.reply_target,
            &command.to_string(),
            started.elapsed(),
            ok,
        );
    }

    /// Answer in the conversation `message` came from. Returns whether the
    /// send went through.
    async fn reply(&self, message: &ChannelMessage, text: &str) -> bool {
        let Some(channel) = self.channels.get(&message.channel) else {
            tracing::warn!(platform = %message.channel, "No channel to reply on");
            return false;
        };
        if let Err(e) = channel.send(text, &message.reply_target).await {
            tracing::warn!(platform = %message.channel, "Failed to send reply: {e:#}");
            return false;
        }
        if !text.contains(SUMMARY_MARKER) {
            self.history.record(
                &message.reply_target,
                MessageRecord::new(&self.name, text, now_secs()),
            );
        }
        true
    }
}
