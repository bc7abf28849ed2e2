//! HTTP surface of the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::gateway::{Gateway, GatewayRequest};

/// Route serving the streaming chat endpoint.
pub const CHAT_ROUTE: &str = "/api/chat";
/// Response header naming the answer source (`upstream` or `fallback`).
pub const SOURCE_HEADER: &str = "x-relay-source";

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn chat(State(gateway): State<Arc<Gateway>>, Json(request): Json<GatewayRequest>) -> Response {
    let reply = gateway.respond(&request).await;
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        [(SOURCE_HEADER, reply.source.as_str())],
        Body::from_stream(reply.body),
    )
        .into_response()
}

/// Builds the gateway router.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route(CHAT_ROUTE, post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Serves the gateway on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("support relay listening on http://{addr}");
    }
    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown)
        .await
}
