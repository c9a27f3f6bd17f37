pub mod cli;
pub mod prompt;
pub mod registry;
pub mod traits;

pub use cli::CliChannel;
pub use prompt::{PendingAnswer, PromptBroker, Prompter};
pub use registry::ChannelRegistry;
pub use traits::{Channel, ChannelMessage, ConversationRef};

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn a listener per registered channel, all feeding `tx`. Each task ends
/// when its adapter's `listen` returns.
pub fn spawn_listeners(
    registry: &ChannelRegistry,
    tx: &mpsc::Sender<ChannelMessage>,
) -> Vec<JoinHandle<Result<()>>> {
    registry
        .all()
        .into_iter()
        .map(|channel: Arc<dyn Channel>| {
            let tx = tx.clone();
            tokio::spawn(async move {
                let name = channel.name().to_string();
                tracing::info!(channel = %name, "Channel listening");
                let result = channel.listen(tx).await;
                match &result {
                    Ok(()) => tracing::info!(channel = %name, "Channel listener stopped"),
                    Err(e) => tracing::error!(channel = %name, "Channel listener failed: {e:#}"),
                }
                result
            })
        })
        .collect()
}
