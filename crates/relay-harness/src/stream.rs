use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;

use crate::errors::{Unavailable, UpstreamError};

/// Flat incremental text body: UTF-8 chunks in emission order.
///
/// An `Err` item is terminal and marks a mid-stream transport failure.
pub type TextStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, UpstreamError>> + Send + 'static>>;

/// Outcome of opening the upstream provider.
pub enum UpstreamReply {
    /// A live relay of upstream deltas.
    Live(TextStream),
    /// The upstream cannot be used for this request.
    Unavailable(Unavailable),
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live(_) => f.write_str("Live(..)"),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Wraps a complete string as a stream that yields it once and closes.
pub fn single_chunk(text: impl Into<String>) -> TextStream {
    let bytes = Bytes::from(text.into());
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Drains a stream and concatenates its chunks.
///
/// Stops at the first error and returns it.
pub async fn collect_text(mut stream: TextStream) -> Result<String, UpstreamError> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_chunk_yields_once() {
        let mut stream = single_chunk("whole answer");
        assert_eq!(
            stream.next().await.expect("chunk").expect("ok"),
            Bytes::from_static(b"whole answer")
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_text_surfaces_terminal_error() {
        let items: Vec<Result<Bytes, UpstreamError>> = vec![
            Ok(Bytes::from_static(b"Hel")),
            Err(UpstreamError::Read("reset".into())),
        ];
        let result = collect_text(Box::pin(stream::iter(items))).await;
        assert_eq!(result, Err(UpstreamError::Read("reset".into())));
    }
}
