/// Errors returned by the client API itself.
///
/// Gateway and transport failures are not errors here: they end a
/// submission as `SubmitOutcome::Errored` with the apology message shown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Another submission is still in flight for this session.
    #[error("a submission is already in flight")]
    Busy,
    /// The HTTP client could not be constructed.
    #[error("client config error: {0}")]
    Config(String),
}
