use super::record::ResumeRecord;
use super::signal::RebootSignal;
use crate::channels::{Channel, ConversationRef, Prompter};
use crate::config::Config;
use crate::diagnostics::DiagnosticsCapture;
use crate::error::{HandoffError, RebootError};
use crate::history::{ConversationBuffer, MessageRecord};
use crate::signal::{SignalKey, SignalStore};
use crate::util::{now_millis, now_secs};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Where a restart attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootPhase {
    Idle,
    AwaitingConfirmation,
    Flushing,
    SignalWritten,
    Exiting,
}

/// An already-authorized request to restart the bot.
#[derive(Debug, Clone)]
pub struct RebootRequest {
    pub origin: ConversationRef,
    /// Ask the supervisor to sync/update before relaunching
    pub sync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebootOutcome {
    /// Requester answered with something other than a confirmation token
    Rejected,
    TimedOut,
    /// State was handed off and the exit hook was invoked
    Restarting(RebootSignal),
}

/// Terminates the process. Swapped out in tests.
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32);
}

pub struct StdProcessExit;

impl ProcessExit for StdProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Runs one restart attempt at a time: confirm with the requester, persist
/// everything the next process needs, then exit.
pub struct RebootCoordinator {
    bot_name: String,
    confirm_timeout: Duration,
    confirm_tokens: Vec<String>,
    store: Arc<dyn SignalStore>,
    history: Arc<ConversationBuffer>,
    diagnostics: Arc<DiagnosticsCapture>,
    prompter: Arc<dyn Prompter>,
    exit: Arc<dyn ProcessExit>,
    phase: Mutex<RebootPhase>,
}

/// Puts the phase back to `Idle` unless disarmed, so an abandoned
/// confirmation never wedges the coordinator.
struct PendingGuard<'a> {
    phase: &'a Mutex<RebootPhase>,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.phase.lock() = RebootPhase::Idle;
        }
    }
}

impl RebootCoordinator {
    pub fn new(
        config: &Config,
        store: Arc<dyn SignalStore>,
        history: Arc<ConversationBuffer>,
        diagnostics: Arc<DiagnosticsCapture>,
        prompter: Arc<dyn Prompter>,
        exit: Arc<dyn ProcessExit>,
    ) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            confirm_timeout: Duration::from_secs(config.reboot.confirm_timeout_secs),
            confirm_tokens: config.reboot.confirm_tokens.clone(),
            store,
            history,
            diagnostics,
            prompter,
            exit,
            phase: Mutex::new(RebootPhase::Idle),
        }
    }

    pub fn phase(&self) -> RebootPhase {
        *self.phase.lock()
    }

    /// Drive a restart request to completion. `channel` is the adapter the
    /// request arrived on; every reply goes back through it.
    pub async fn request(
        &self,
        request: RebootRequest,
        channel: &dyn Channel,
    ) -> Result<RebootOutcome, RebootError> {
        let origin = request.origin;
        let mut guard = match self.begin() {
            Some(guard) => guard,
            None => {
                tracing::warn!(user = %origin.user_id, "Restart request rejected: one is already pending");
                self.reply(channel, &origin, "Another restart is already in progress.")
                    .await;
                return Err(RebootError::AlreadyPending);
            }
        };

        let pending = self.prompter.register(&origin);
        let prompt = format!(
            "Send {} within {} seconds to confirm restarting {}.",
            self.token_list(),
            self.confirm_timeout.as_secs(),
            self.bot_name
        );
        if let Err(e) = channel.send(&prompt, &origin.channel_id).await {
            return Err(RebootError::Channel(e));
        }
        self.record_outbound(&origin, &prompt);

        let answer = pending.wait(self.confirm_timeout).await;

        let rejection = match answer {
            None => Some(HandoffError::Timeout(self.confirm_timeout.as_secs())),
            Some(token) if self.is_confirmation(&token) => None,
            Some(_) => Some(HandoffError::UserRejected),
        };
        if let Some(reason) = rejection {
            tracing::info!(user = %origin.user_id, "Restart not confirmed: {reason}");
            let (text, outcome) = match reason {
                HandoffError::Timeout(secs) => (
                    format!("Restart cancelled: no confirmation within {secs} seconds."),
                    RebootOutcome::TimedOut,
                ),
                _ => ("Restart cancelled.".to_string(), RebootOutcome::Rejected),
            };
            self.reply(channel, &origin, &text).await;
            return Ok(outcome);
        }

        guard.disarm();
        self.set_phase(RebootPhase::Flushing);

        let signal = RebootSignal::for_request(request.sync);
        let record = ResumeRecord::new(signal, &origin, now_millis()).with_option("sync", request.sync);
        tracing::info!(
            user = %origin.user_id,
            platform = %origin.platform,
            signal = %signal,
            "Restart confirmed"
        );

        self.hand_off(&record).await;
        self.set_phase(RebootPhase::SignalWritten);

        self.reply(channel, &origin, &format!("{} is restarting...", self.bot_name))
            .await;

        self.set_phase(RebootPhase::Exiting);
        self.exit.exit(0);
        Ok(RebootOutcome::Restarting(signal))
    }

    fn begin(&self) -> Option<PendingGuard<'_>> {
        let mut phase = self.phase.lock();
        if *phase != RebootPhase::Idle {
            return None;
        }
        *phase = RebootPhase::AwaitingConfirmation;
        Some(PendingGuard {
            phase: &self.phase,
            armed: true,
        })
    }

    fn set_phase(&self, next: RebootPhase) {
        *self.phase.lock() = next;
    }

    fn is_confirmation(&self, answer: &str) -> bool {
        let answer = answer.trim();
        self.confirm_tokens.iter().any(|t| t == answer)
    }

    fn token_list(&self) -> String {
        self.confirm_tokens
            .iter()
            .map(|t| format!("`{t}`"))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Flush history and diagnostics, then write the signal and resume record.
    /// Failures are logged; the restart goes ahead regardless.
    async fn hand_off(&self, record: &ResumeRecord) {
        let store = self.store.as_ref();

        if let Err(e) = self.history.flush(store).await {
            tracing::error!("{e}");
        }
        if let Err(e) = self.diagnostics.flush(store).await {
            tracing::error!("{e}");
        }

        if record.signal.is_empty() {
            tracing::warn!("Refusing to write an empty restart signal");
            return;
        }
        if let Err(e) = store.write(SignalKey::Signal, &record.signal.to_decimal()).await {
            tracing::error!("{}", HandoffError::persistence(SignalKey::Signal, e));
        }

        let json = match record.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode resume record: {e}");
                return;
            }
        };
        if let Err(e) = store.write(SignalKey::LastSession, &json).await {
            tracing::error!("{}", HandoffError::persistence(SignalKey::LastSession, e));
        }
    }

    async fn reply(&self, channel: &dyn Channel, origin: &ConversationRef, text: &str) {
        match channel.send(text, &origin.channel_id).await {
            Ok(()) => self.record_outbound(origin, text),
            Err(e) => tracing::warn!(platform = %origin.platform, "Failed to send reply: {e:#}"),
        }
    }

    fn record_outbound(&self, origin: &ConversationRef, text: &str) {
        self.history.record(
            &origin.channel_id,
            MessageRecord::new(&self.bot_name, text, now_secs()),
        );
    }
}
