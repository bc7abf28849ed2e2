//! Support relay gateway.
//!
//! One streaming endpoint that forwards model output from the upstream
//! provider, or answers from ordered fallback rules when the provider cannot
//! be used. Both paths share the same plain-text streaming response.

pub mod config;
pub mod context;
pub mod fallback;
pub mod gateway;
pub mod observability;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, GatewayConfig};
pub use context::{ContextProvider, FaqContext, FaqEntry, NoContext};
pub use fallback::{CLARIFICATION_REPLY, fallback_reply};
pub use gateway::{Gateway, GatewayReply, GatewayRequest, ReplySource};
pub use observability::init_observability;
pub use server::{CHAT_ROUTE, router, serve};
