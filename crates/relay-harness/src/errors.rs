/// Reason the upstream provider could not be used for a request.
///
/// Every variant leads to the same fallback path; the distinction exists for
/// logs only and is never surfaced to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    /// No credential configured; no request was attempted.
    #[error("no upstream credential configured")]
    MissingCredential,
    /// The provider answered with a non-success status.
    #[error("upstream rejected request with status {status}")]
    Rejected { status: u16 },
    /// The provider answered without a body to stream.
    #[error("upstream response has no body")]
    EmptyBody,
    /// The request could not be sent.
    #[error("upstream request failed: {0}")]
    Transport(String),
    /// Response headers did not arrive within the response timeout.
    #[error("upstream did not respond in time")]
    Timeout,
}

impl Unavailable {
    /// Short stable label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Rejected { .. } => "rejected",
            Self::EmptyBody => "empty_body",
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
        }
    }
}

/// Failure of a live relay after the first byte has been accepted.
///
/// Yielded as the last item of a `TextStream`; content emitted before it
/// stays emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Reading the upstream body failed.
    #[error("upstream read failed: {0}")]
    Read(String),
    /// No upstream chunk arrived within the idle timeout.
    #[error("upstream stalled for longer than {idle_ms} ms")]
    Idle { idle_ms: u64 },
}

/// Errors returned while building harness components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid upstream configuration.
    #[error("config error: {0}")]
    Config(String),
}
