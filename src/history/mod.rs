//! Per-channel conversation history: a bounded ring buffer that survives
//! restarts through the signal store.

pub mod buffer;
pub mod record;

pub use buffer::{ConversationBuffer, UNSERIALIZABLE_SENTINEL};
pub use record::MessageRecord;
