use crate::channels::traits::ChannelMessage;
use crate::util::truncate_with_ellipsis;
use serde::{Deserialize, Serialize};

/// One buffered chat line. This is the only shape that reaches the snapshot
/// file; upstream message objects are converted, never serialized directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub author: String,
    pub content: String,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

impl MessageRecord {
    pub fn new(author: impl Into<String>, content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Convert an inbound channel message, capping the body at `max_chars`.
    pub fn from_message(message: &ChannelMessage, max_chars: usize) -> Self {
        Self {
            author: message.sender.clone(),
            content: truncate_with_ellipsis(&message.content, max_chars),
            timestamp: message.timestamp,
        }
    }
}
