use super::traits::{ChannelMessage, ConversationRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;

/// Ask one user a question and wait for their next message.
pub trait Prompter: Send + Sync {
    /// Start listening for the next message `origin.user_id` sends in
    /// `origin.channel_id`. Register before asking, so an answer that races
    /// the question is still caught.
    fn register(&self, origin: &ConversationRef) -> PendingAnswer;
}

/// The receiving end of a registered prompt.
pub struct PendingAnswer {
    rx: oneshot::Receiver<String>,
}

impl PendingAnswer {
    pub fn new(rx: oneshot::Receiver<String>) -> Self {
        Self { rx }
    }

    /// An answer that is already in.
    pub fn ready(answer: impl Into<String>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(answer.into());
        Self { rx }
    }

    /// The answer, or `None` once `timeout` elapses or the prompt is dropped.
    pub async fn wait(self, timeout: Duration) -> Option<String> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(answer)) => Some(answer),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

/// Routes replies to waiting prompts.
///
/// The dispatcher calls [`offer`](Self::offer) with every inbound message
/// before anything else; a message that answers a pending prompt is consumed
/// there and never reaches command handling.
#[derive(Default)]
pub struct PromptBroker {
    waiters: Mutex<HashMap<ConversationRef, oneshot::Sender<String>>>,
}

impl PromptBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `message` to a waiting prompt. Returns `true` if it was consumed.
    pub fn offer(&self, message: &ChannelMessage) -> bool {
        let key = ConversationRef::from_message(message);
        let Some(waiter) = self.waiters.lock().remove(&key) else {
            return false;
        };
        waiter.send(message.content.trim().to_string()).is_ok()
    }

    /// Prompts still waiting for an answer.
    pub fn pending(&self) -> usize {
        self.waiters.lock().values().filter(|tx| !tx.is_closed()).count()
    }
}

impl Prompter for PromptBroker {
    fn register(&self, origin: &ConversationRef) -> PendingAnswer {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock();
        // Abandoned prompts (timed out, dropped) leave closed senders behind.
        waiters.retain(|_, tx| !tx.is_closed());
        if waiters.insert(origin.clone(), tx).is_some() {
            tracing::debug!(user = %origin.user_id, "Superseding earlier prompt");
        }
        PendingAnswer::new(rx)
    }
}
