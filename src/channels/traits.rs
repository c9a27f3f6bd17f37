use async_trait::async_trait;

/// A message received from a channel
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: String,
    /// User id of the author
    pub sender: String,
    /// Conversation (room / group / DM) the message arrived in; replies go here
    pub reply_target: String,
    pub content: String,
    /// Platform name of the adapter that delivered the message
    pub channel: String,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

/// Who said something, where: enough to reply to (or wait on) one user in one
/// conversation on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationRef {
    pub platform: String,
    pub channel_id: String,
    pub user_id: String,
}

impl ConversationRef {
    pub fn new(
        platform: impl Into<String>,
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn from_message(message: &ChannelMessage) -> Self {
        Self::new(&message.channel, &message.reply_target, &message.sender)
    }
}

/// Core channel trait, implemented once per messaging platform
#[async_trait]
pub trait Channel: Send + Sync {
    /// Platform name, used to route replies after a restart
    fn name(&self) -> &str;

    /// Send a message to a conversation on this platform
    async fn send(&self, message: &str, recipient: &str) -> anyhow::Result<()>;

    /// Start listening for incoming messages (long-running)
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()>;

    /// Check if channel is healthy
    async fn health_check(&self) -> bool {
        true
    }

    /// Platform markup that mentions `user_id`
    fn mention(&self, user_id: &str) -> String {
        format!("@{user_id}")
    }
}
