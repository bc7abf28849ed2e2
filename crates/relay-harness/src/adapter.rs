use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument as _, debug, info_span, warn};

use crate::config::UpstreamConfig;
use crate::errors::{HarnessError, Unavailable, UpstreamError};
use crate::message::Role;
use crate::stream::{TextStream, UpstreamReply};
use crate::transport::{EventStreamDecoder, Frame};

/// Seam between the gateway and whatever produces model output.
///
/// `open` never fails: every problem is reported as
/// `UpstreamReply::Unavailable` so callers can fall back uniformly.
#[async_trait::async_trait]
pub trait UpstreamAdapter: Send + Sync {
    async fn open(&self, system: &str, user: &str) -> UpstreamReply;
}

/// Adapter for OpenAI-compatible `/v1/chat/completions` streaming.
pub struct OpenAiChatAdapter {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl OpenAiChatAdapter {
    /// Creates an adapter from explicit configuration.
    ///
    /// A missing credential is accepted; `open` then reports
    /// `Unavailable::MissingCredential` without any network attempt.
    pub fn new(config: UpstreamConfig) -> Result<Self, HarnessError> {
        if config.stream_buffer_capacity == 0 {
            return Err(HarnessError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build upstream client: {e}")))?;
        Ok(Self { client, config })
    }

    fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            idle_timeout: self.config.idle_timeout,
            buffer_capacity: self.config.stream_buffer_capacity,
        }
    }
}

#[async_trait::async_trait]
impl UpstreamAdapter for OpenAiChatAdapter {
    async fn open(&self, system: &str, user: &str) -> UpstreamReply {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return UpstreamReply::Unavailable(Unavailable::MissingCredential);
        };

        let relay_id = uuid::Uuid::new_v4();
        let body = build_request_body(&self.config, system, user);
        debug!(%relay_id, model = %self.config.model, "opening upstream chat stream");

        let send = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send();
        let response = match tokio::time::timeout(self.config.response_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return UpstreamReply::Unavailable(Unavailable::Transport(e.to_string()));
            }
            Err(_) => return UpstreamReply::Unavailable(Unavailable::Timeout),
        };

        let status = response.status();
        if !status.is_success() {
            return UpstreamReply::Unavailable(Unavailable::Rejected {
                status: status.as_u16(),
            });
        }
        if status == reqwest::StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return UpstreamReply::Unavailable(Unavailable::EmptyBody);
        }

        let span = info_span!("upstream_relay", %relay_id);
        let stream =
            span.in_scope(|| relay_event_stream(response.bytes_stream(), self.relay_options()));
        UpstreamReply::Live(stream)
    }
}

pub(crate) fn build_request_body(
    config: &UpstreamConfig,
    system: &str,
    user: &str,
) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": Role::System.as_str(), "content": system },
            { "role": Role::User.as_str(), "content": user },
        ],
        "temperature": config.temperature,
        "stream": true,
    })
}

/// Tuning for a single relay task.
#[derive(Clone, Copy, Debug)]
pub struct RelayOptions {
    /// Maximum gap between upstream chunks.
    pub idle_timeout: Duration,
    /// Bounded channel capacity towards the consumer.
    pub buffer_capacity: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        let config = UpstreamConfig::default();
        Self {
            idle_timeout: config.idle_timeout,
            buffer_capacity: config.stream_buffer_capacity,
        }
    }
}

type ByteStream<E> = Pin<Box<dyn futures::Stream<Item = Result<Bytes, E>> + Send + 'static>>;

/// Re-frames a raw event-stream body into a flat stream of text deltas.
///
/// The relay runs on its own task and must be started inside a Tokio
/// runtime. It ends on the `[DONE]` sentinel, on upstream EOF, after a
/// terminal read error, or as soon as the returned stream is dropped.
pub fn relay_event_stream<S, E>(bytes: S, options: RelayOptions) -> TextStream
where
    S: futures::Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(options.buffer_capacity.max(1));
    tokio::spawn(relay_task(Box::pin(bytes), tx, options).in_current_span());
    Box::pin(ReceiverStream::new(rx))
}

async fn relay_task<E: std::fmt::Display + Send + 'static>(
    mut bytes: ByteStream<E>,
    tx: mpsc::Sender<Result<Bytes, UpstreamError>>,
    options: RelayOptions,
) {
    let mut decoder = EventStreamDecoder::default();
    let mut emitted = 0_u64;
    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(emitted, "downstream closed; dropping upstream connection");
                return;
            }
            next = tokio::time::timeout(options.idle_timeout, bytes.next()) => next,
        };

        match next {
            Ok(Some(Ok(chunk))) => {
                for frame in decoder.push_chunk(&chunk) {
                    match frame {
                        Frame::Delta(text) => {
                            if tx.send(Ok(Bytes::from(text))).await.is_err() {
                                debug!(emitted, "downstream closed mid-chunk");
                                return;
                            }
                            emitted = emitted.saturating_add(1);
                        }
                        Frame::Done => {
                            debug!(emitted, "upstream sent done sentinel");
                            return;
                        }
                    }
                }
            }
            Ok(Some(Err(e))) => {
                warn!(emitted, error = %e, "upstream read failed mid-stream");
                let _ = tx.send(Err(UpstreamError::Read(e.to_string()))).await;
                return;
            }
            Ok(None) => {
                debug!(emitted, "upstream closed without done sentinel");
                return;
            }
            Err(_) => {
                let idle_ms = u64::try_from(options.idle_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(emitted, idle_ms, "upstream stalled");
                let _ = tx.send(Err(UpstreamError::Idle { idle_ms })).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::collect_text;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn delta_record(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices":[{"index":0,"delta":{"content":text}}]})
        )
    }

    fn body_bytes(deltas: &[&str]) -> Vec<u8> {
        let mut body = String::new();
        for delta in deltas {
            body.push_str(&delta_record(delta));
        }
        body.push_str("data: [DONE]\n\n");
        body.into_bytes()
    }

    fn chunked(bytes: &[u8], splits: &[usize]) -> Vec<Result<Bytes, std::io::Error>> {
        let mut chunks = Vec::new();
        let mut start = 0;
        for &split in splits {
            chunks.push(Ok(Bytes::copy_from_slice(&bytes[start..split])));
            start = split;
        }
        chunks.push(Ok(Bytes::copy_from_slice(&bytes[start..])));
        chunks
    }

    async fn relay_chunks(chunks: Vec<Result<Bytes, std::io::Error>>) -> Result<String, UpstreamError> {
        collect_text(relay_event_stream(stream::iter(chunks), RelayOptions::default())).await
    }

    #[tokio::test]
    async fn output_is_independent_of_split_points() {
        let bytes = body_bytes(&["Hé", "llo ", "wörld ", "✓🎉"]);
        let expected = "Héllo wörld ✓🎉";
        for split in 1..bytes.len() {
            let text = relay_chunks(chunked(&bytes, &[split])).await.expect("relay");
            assert_eq!(text, expected, "single split at byte {split}");
        }
        for first in (1..bytes.len()).step_by(7) {
            for second in (first..bytes.len()).step_by(5) {
                let text = relay_chunks(chunked(&bytes, &[first, second]))
                    .await
                    .expect("relay");
                assert_eq!(text, expected, "splits at {first} and {second}");
            }
        }
    }

    #[tokio::test]
    async fn byte_at_a_time_delivery_matches_whole_body() {
        let bytes = body_bytes(&["日本", "語"]);
        let splits: Vec<usize> = (1..bytes.len()).collect();
        let text = relay_chunks(chunked(&bytes, &splits)).await.expect("relay");
        assert_eq!(text, "日本語");
    }

    #[tokio::test]
    async fn sentinel_stops_emission_even_with_trailing_records() {
        let mut body = delta_record("kept");
        body.push_str("data: [DONE]\n");
        body.push_str(&delta_record("dropped"));
        let text = relay_chunks(vec![Ok(Bytes::from(body))]).await.expect("relay");
        assert_eq!(text, "kept");
    }

    #[tokio::test]
    async fn eof_without_sentinel_closes_output() {
        let body = format!("{}{}data: {{\"choices\"", delta_record("a"), delta_record("b"));
        let text = relay_chunks(vec![Ok(Bytes::from(body))]).await.expect("relay");
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn read_error_ends_stream_after_emitted_content() {
        let chunks = vec![
            Ok(Bytes::from(delta_record("Hel"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from(delta_record("lo"))),
        ];
        let mut stream = relay_event_stream(stream::iter(chunks), RelayOptions::default());
        let first = stream.next().await.expect("first").expect("ok");
        assert_eq!(first, Bytes::from_static(b"Hel"));
        let second = stream.next().await.expect("second");
        assert!(matches!(second, Err(UpstreamError::Read(message)) if message.contains("reset")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stalled_upstream_fails_with_idle_error() {
        let options = RelayOptions {
            idle_timeout: Duration::from_millis(30),
            buffer_capacity: 4,
        };
        let pending = stream::pending::<Result<Bytes, std::io::Error>>();
        let result = collect_text(relay_event_stream(pending, options)).await;
        assert_eq!(result, Err(UpstreamError::Idle { idle_ms: 30 }));
    }

    #[tokio::test]
    async fn dropping_output_releases_upstream() {
        let (up_tx, up_rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(4);
        let mut stream = relay_event_stream(ReceiverStream::new(up_rx), RelayOptions::default());
        up_tx
            .send(Ok(Bytes::from(delta_record("first"))))
            .await
            .expect("send");
        assert_eq!(
            stream.next().await.expect("delta").expect("ok"),
            Bytes::from_static(b"first")
        );

        drop(stream);
        let released = tokio::time::timeout(Duration::from_secs(1), up_tx.closed()).await;
        assert!(released.is_ok(), "relay task kept reading after downstream drop");
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn missing_credential_never_contacts_upstream() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    String::new()
                }
            }),
        );
        let base_url = spawn_upstream(app).await;
        let adapter =
            OpenAiChatAdapter::new(UpstreamConfig::without_credential().base_url(base_url))
                .expect("adapter");

        let reply = adapter.open("sys", "hello").await;
        assert!(matches!(
            reply,
            UpstreamReply::Unavailable(Unavailable::MissingCredential)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base_url = spawn_upstream(app).await;
        let adapter = OpenAiChatAdapter::new(UpstreamConfig::new("sk-test").base_url(base_url))
            .expect("adapter");

        let reply = adapter.open("sys", "hello").await;
        assert!(matches!(
            reply,
            UpstreamReply::Unavailable(Unavailable::Rejected { status: 500 })
        ));
    }

    #[tokio::test]
    async fn empty_body_is_unavailable() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::NO_CONTENT }),
        );
        let base_url = spawn_upstream(app).await;
        let adapter = OpenAiChatAdapter::new(UpstreamConfig::new("sk-test").base_url(base_url))
            .expect("adapter");

        let reply = adapter.open("sys", "hello").await;
        assert!(matches!(
            reply,
            UpstreamReply::Unavailable(Unavailable::EmptyBody)
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let adapter = OpenAiChatAdapter::new(
            UpstreamConfig::new("sk-test").base_url(format!("http://{addr}")),
        )
        .expect("adapter");

        let reply = adapter.open("sys", "hello").await;
        assert!(matches!(
            reply,
            UpstreamReply::Unavailable(Unavailable::Transport(_))
        ));
    }

    #[tokio::test]
    async fn slow_response_headers_time_out() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                String::new()
            }),
        );
        let base_url = spawn_upstream(app).await;
        let adapter = OpenAiChatAdapter::new(
            UpstreamConfig::new("sk-test")
                .base_url(base_url)
                .response_timeout(Duration::from_millis(100)),
        )
        .expect("adapter");

        let started = std::time::Instant::now();
        let reply = adapter.open("sys", "hello").await;
        assert!(matches!(
            reply,
            UpstreamReply::Unavailable(Unavailable::Timeout)
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn live_stream_relays_deltas_and_sends_expected_request() {
        let seen = Arc::new(std::sync::Mutex::new(None::<(String, serde_json::Value)>));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(
                move |headers: HeaderMap, axum::Json(body): axum::Json<serde_json::Value>| {
                    let recorder = recorder.clone();
                    async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        *recorder.lock().expect("lock") = Some((auth, body));
                        let mut sse = delta_record("Hel");
                        sse.push_str(&delta_record("lo"));
                        sse.push_str("data: [DONE]\n\n");
                        ([("content-type", "text/event-stream")], sse)
                    }
                },
            ),
        );
        let base_url = spawn_upstream(app).await;
        let adapter = OpenAiChatAdapter::new(UpstreamConfig::new("sk-test").base_url(base_url))
            .expect("adapter");

        let UpstreamReply::Live(stream) = adapter.open("be brief", "hi there").await else {
            panic!("expected live stream");
        };
        assert_eq!(collect_text(stream).await.expect("collect"), "Hello");

        let (auth, body) = seen.lock().expect("lock").clone().expect("request recorded");
        assert_eq!(auth, "Bearer sk-test");
        assert_eq!(body["stream"], serde_json::json!(true));
        assert_eq!(body["model"], serde_json::json!("gpt-4o-mini"));
        assert_eq!(body["messages"][0]["role"], serde_json::json!("system"));
        assert_eq!(body["messages"][0]["content"], serde_json::json!("be brief"));
        assert_eq!(body["messages"][1]["content"], serde_json::json!("hi there"));
    }

    #[test]
    fn zero_buffer_capacity_is_rejected() {
        let result = OpenAiChatAdapter::new(UpstreamConfig::new("k").stream_buffer_capacity(0));
        assert!(matches!(result, Err(HarnessError::Config(message)) if message.contains("stream_buffer_capacity")));
    }
}
