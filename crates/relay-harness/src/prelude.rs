//! Common imports for typical harness usage.
pub use crate::{
    ConversationTurn, HarnessError, OpenAiChatAdapter, Role, TextStream, Unavailable,
    UpstreamAdapter, UpstreamConfig, UpstreamError, UpstreamReply, collect_text,
};
