//! Upstream side of the support relay.
//!
//! Opens a streaming chat-completions request and re-frames the provider's
//! `data:` event stream into a flat stream of UTF-8 text deltas. Every
//! failure to start is reported as `UpstreamReply::Unavailable` rather than
//! an error, so callers can substitute their own answer.
//!
//! ```no_run
//! use relay_harness::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let adapter = OpenAiChatAdapter::new(UpstreamConfig::from_env())?;
//! match adapter.open("Answer briefly.", "Say hello").await {
//!     UpstreamReply::Live(stream) => println!("{:?}", collect_text(stream).await),
//!     UpstreamReply::Unavailable(reason) => eprintln!("upstream unavailable: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

/// Upstream adapter contract and the OpenAI-compatible implementation.
pub mod adapter;
/// Upstream client configuration.
pub mod config;
/// Incremental UTF-8 decoding.
pub mod decode;
/// Error and unavailability types.
pub mod errors;
/// Conversation data model.
pub mod message;
/// Common imports for typical usage.
pub mod prelude;
/// Flat text stream type and helpers.
pub mod stream;
mod transport;

pub use adapter::{OpenAiChatAdapter, RelayOptions, UpstreamAdapter, relay_event_stream};
pub use config::UpstreamConfig;
pub use decode::Utf8Decoder;
pub use errors::{HarnessError, Unavailable, UpstreamError};
pub use message::{ConversationTurn, Role, last_user_turn};
pub use stream::{TextStream, UpstreamReply, collect_text, single_chunk};
