use super::traits::{Channel, ChannelMessage};
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

/// Conversation id every console line belongs to
pub const CLI_CONVERSATION: &str = "local";

/// CLI channel: stdin/stdout, always available
pub struct CliChannel {
    user: String,
}

impl CliChannel {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }

    /// Console user taken from `$USER`, falling back to "console".
    pub fn from_env() -> Self {
        let user = std::env::var("USER")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "console".to_string());
        Self::new(user)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn to_message(&self, line: String) -> ChannelMessage {
        ChannelMessage {
            id: Uuid::new_v4().to_string(),
            sender: self.user.clone(),
            reply_target: CLI_CONVERSATION.to_string(),
            content: line,
            channel: "cli".to_string(),
            timestamp: crate::util::now_secs(),
        }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send(&self, message: &str, _recipient: &str) -> anyhow::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(format!("{message}\n").as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" || line == "/exit" {
                break;
            }

            if tx.send(self.to_message(line)).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    fn mention(&self, user_id: &str) -> String {
        format!("<{user_id}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_channel_name() {
        assert_eq!(CliChannel::new("me").name(), "cli");
    }

    #[test]
    fn lines_become_messages_in_local_conversation() {
        let ch = CliChannel::new("dragon");
        let msg = ch.to_message("reboot --sync".into());
        assert_eq!(msg.sender, "dragon");
        assert_eq!(msg.reply_target, CLI_CONVERSATION);
        assert_eq!(msg.channel, "cli");
        assert_eq!(msg.content, "reboot --sync");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn mention_uses_angle_brackets() {
        assert_eq!(CliChannel::new("me").mention("dragon"), "<dragon>");
    }

    #[tokio::test]
    async fn cli_channel_send_does_not_panic() {
        let ch = CliChannel::new("me");
        assert!(ch.send("hello", CLI_CONVERSATION).await.is_ok());
    }
}
