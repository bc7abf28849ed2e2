use std::time::Duration;

/// Configuration for the upstream chat-completions client.
///
/// The credential gates every upstream attempt: when `api_key` is `None` the
/// adapter reports the upstream as unavailable without touching the network.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// API key used for bearer auth. Blank keys are normalized to `None`.
    pub api_key: Option<String>,
    /// Base URL for the OpenAI-compatible endpoint.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Sampling temperature sent with every request.
    pub temperature: f32,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Maximum wait for response headers before the upstream counts as unavailable.
    pub response_timeout: Duration,
    /// Maximum gap between two body chunks before the relay fails mid-stream.
    pub idle_timeout: Duration,
    /// Bounded buffer between the relay task and the downstream body.
    pub stream_buffer_capacity: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
            stream_buffer_capacity: 64,
        }
    }
}

impl UpstreamConfig {
    /// Creates a config with defaults and the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().api_key(Some(api_key.into()))
    }

    /// Creates a config with no credential; every attempt falls back.
    pub fn without_credential() -> Self {
        Self::default()
    }

    /// Builds a config from `OPENAI_API_KEY`, `RELAY_UPSTREAM_URL` and `RELAY_MODEL`.
    ///
    /// A missing key is not an error here; it only disables upstream attempts.
    pub fn from_env() -> Self {
        let mut config = Self::default().api_key(std::env::var("OPENAI_API_KEY").ok());
        if let Ok(url) = std::env::var("RELAY_UPSTREAM_URL")
            && !url.trim().is_empty()
        {
            config = config.base_url(url.trim());
        }
        if let Ok(model) = std::env::var("RELAY_MODEL")
            && !model.trim().is_empty()
        {
            config = config.model(model.trim());
        }
        config
    }

    /// Sets or clears the API key.
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the response-header timeout.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Overrides the idle timeout between body chunks.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Overrides the relay channel capacity.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    /// Returns true when a usable credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
