use std::sync::Arc;

use relay_harness::{
    ConversationTurn, OpenAiChatAdapter, TextStream, UpstreamAdapter, UpstreamReply,
    last_user_turn, single_chunk,
};
use tracing::{debug, info};

use crate::config::{ConfigError, GatewayConfig};
use crate::context::{ContextProvider, FaqContext, NoContext};
use crate::fallback::fallback_reply;

/// Fixed persona and policy lines opening every system instruction.
pub const PREAMBLE: [&str; 3] = [
    "You are a concise, helpful customer support AI.",
    "Only answer based on policies and facts. If uncertain, ask clarifying questions.",
    "If a refund is requested within 30 days, explain the steps and requirements.",
];

/// Inbound chat request: the conversation so far, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GatewayRequest {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
}

impl GatewayRequest {
    pub fn new(messages: Vec<ConversationTurn>) -> Self {
        Self { messages }
    }

    /// Content of the latest `user` turn, or `""`.
    pub fn last_user_turn(&self) -> &str {
        last_user_turn(&self.messages)
    }
}

/// Where the streamed answer comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplySource {
    Upstream,
    Fallback,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Fallback => "fallback",
        }
    }
}

/// Streamed answer for one request.
pub struct GatewayReply {
    pub source: ReplySource,
    pub body: TextStream,
}

/// Builds the system instruction: preamble lines, then grounding when present,
/// separated by blank lines.
pub fn system_instruction(grounding: &str) -> String {
    let mut sections: Vec<&str> = PREAMBLE.to_vec();
    if !grounding.is_empty() {
        sections.push(grounding);
    }
    sections.join("\n\n")
}

/// Fallback answer for `user`, followed by the grounding text when present.
pub fn compose_fallback(user: &str, grounding: &str) -> String {
    let reply = fallback_reply(user);
    if grounding.is_empty() {
        reply.to_string()
    } else {
        format!("{reply}\n\n{grounding}")
    }
}

/// Request orchestration: grounding, upstream attempt, fallback substitution.
///
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct Gateway {
    upstream: Arc<dyn UpstreamAdapter>,
    context: Arc<dyn ContextProvider>,
}

impl Gateway {
    pub fn new(upstream: Arc<dyn UpstreamAdapter>, context: Arc<dyn ContextProvider>) -> Self {
        Self { upstream, context }
    }

    /// Wires the OpenAI-compatible adapter and the configured FAQ (if any).
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let upstream = Arc::new(OpenAiChatAdapter::new(config.upstream.clone())?);
        let context: Arc<dyn ContextProvider> = match &config.faq_path {
            Some(path) => {
                let faq = FaqContext::from_json_file(path)?;
                info!(path = %path.display(), entries = faq.len(), "loaded FAQ grounding");
                Arc::new(faq)
            }
            None => Arc::new(NoContext),
        };
        if !config.upstream.has_credential() {
            info!("no upstream credential configured; all answers use fallback rules");
        }
        Ok(Self::new(upstream, context))
    }

    pub async fn respond(&self, request: &GatewayRequest) -> GatewayReply {
        let user = request.last_user_turn();
        let grounding = self.context.lookup(user);
        let system = system_instruction(&grounding);
        debug!(
            turns = request.messages.len(),
            grounded = !grounding.is_empty(),
            "handling chat request"
        );

        match self.upstream.open(&system, user).await {
            UpstreamReply::Live(body) => GatewayReply {
                source: ReplySource::Upstream,
                body,
            },
            UpstreamReply::Unavailable(reason) => {
                info!(reason = reason.label(), detail = %reason, "answering from fallback rules");
                GatewayReply {
                    source: ReplySource::Fallback,
                    body: single_chunk(compose_fallback(user, &grounding)),
                }
            }
        }
    }
}
