use relay_harness::ConversationTurn;

use crate::errors::ClientError;

#[derive(serde::Serialize)]
struct ChatBody<'a> {
    messages: &'a [ConversationTurn],
}

/// HTTP client for the gateway's chat endpoint.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    chat_url: String,
}

impl GatewayClient {
    /// Creates a client for a gateway at `base_url` (for example `http://127.0.0.1:3000`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", base_url.as_ref().trim_end_matches('/')),
        })
    }

    /// Full URL of the chat endpoint this client posts to.
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub(crate) async fn send(
        &self,
        messages: &[ConversationTurn],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(&self.chat_url)
            .json(&ChatBody { messages })
            .send()
            .await
    }
}
