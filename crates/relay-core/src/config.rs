use std::net::SocketAddr;
use std::path::PathBuf;

use relay_harness::{HarnessError, UpstreamConfig};

/// Errors from configuration and knowledge-base loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Harness(#[from] HarnessError),
}

/// Gateway process configuration.
///
/// Built once at startup and handed to the gateway; core code never reads
/// the process environment itself.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub upstream: UpstreamConfig,
    /// Optional JSON FAQ file used for grounding.
    pub faq_path: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream: UpstreamConfig::default(),
            faq_path: None,
        }
    }
}

impl GatewayConfig {
    /// Reads `RELAY_BIND`, `RELAY_FAQ_PATH` and the upstream variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            upstream: UpstreamConfig::from_env(),
            ..Self::default()
        };
        if let Ok(raw) = std::env::var("RELAY_BIND") {
            config.bind = parse_bind(&raw)?;
        }
        if let Ok(raw) = std::env::var("RELAY_FAQ_PATH")
            && !raw.trim().is_empty()
        {
            config.faq_path = Some(PathBuf::from(raw.trim()));
        }
        Ok(config)
    }

    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn faq_path(mut self, path: Option<PathBuf>) -> Self {
        self.faq_path = path;
        self
    }
}

pub fn parse_bind(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: "RELAY_BIND",
            value: raw.to_string(),
        })
}
