//! HTTP status API
//!
//! - `GET  /api/presence/status`  current status snapshot
//! - `POST /api/presence/trigger` manual presence
//! - `POST /api/presence/disable` stop the sensor link, display forced on
//! - `GET  /api/presence/events`  SSE stream of display events
//!
//! Intended for loopback use by the local display shell.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use mmwave_core::{DisplayController, StatusService, StatusSnapshot};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Consecutive ports tried when the requested one is taken
const PORT_ATTEMPTS: u16 = 10;

/// State shared by all handlers
#[derive(Clone)]
pub struct ApiState {
    status: StatusService,
    display: Arc<DisplayController>,
    /// Ends open event streams; set by [`start`]
    shutdown: CancellationToken,
}

impl ApiState {
    pub fn new(status: StatusService, display: Arc<DisplayController>) -> Self {
        Self {
            status,
            display,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/presence/status", get(status))
        .route("/api/presence/trigger", post(trigger))
        .route("/api/presence/disable", post(disable))
        .route("/api/presence/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot().await)
}

async fn trigger(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.status.trigger().await)
}

async fn disable(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.status.disable().await)
}

/// SSE stream of display events for UI layers
async fn events(State(state): State<ApiState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.display.subscribe();
    let shutdown = state.shutdown.clone();

    // Graceful shutdown waits on open responses; end with the server
    let stream = async_stream::stream! {
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(event) => yield Ok::<_, Infallible>(Event::default().event(event.name()).data(event.name())),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keepalive"),
    )
}

/// Bind the API, moving up to the next free port if needed
///
/// Returns the bound address and the server task, which exits once `cancel`
/// fires.
pub async fn start(
    bind: SocketAddr,
    mut state: ApiState,
    cancel: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    state.shutdown = cancel.clone();

    if !bind.ip().is_loopback() {
        warn!("Status API bound to non-loopback address {}", bind);
    }

    let mut last_err = None;
    for offset in 0..PORT_ATTEMPTS {
        let Some(port) = bind.port().checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(bind.ip(), port);

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                let addr = listener.local_addr().context("Failed to read bound address")?;
                info!("Status API listening on http://{}", addr);

                let app = router(state);
                let handle = tokio::spawn(async move {
                    let result = axum::serve(listener, app.into_make_service())
                        .with_graceful_shutdown(cancel.cancelled_owned())
                        .await;
                    if let Err(e) = result {
                        warn!("Status API stopped: {}", e);
                    }
                });

                return Ok((addr, handle));
            }
            Err(e) => {
                if offset == 0 {
                    warn!("Port {} in use, trying next port...", port);
                }
                last_err = Some(e);
            }
        }
    }

    let tried = format!(
        "{}-{}",
        bind.port(),
        bind.port().saturating_add(PORT_ATTEMPTS - 1)
    );
    match last_err {
        Some(e) => Err(e).with_context(|| format!("No available port for status API (tried {})", tried)),
        None => Err(anyhow::anyhow!("No available port for status API (tried {})", tried)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use mmwave_core::display::LogOnlyPower;
    use mmwave_core::transport::NativeSerialOpener;
    use mmwave_core::{display, PresenceEngine, SensorConfig, SensorLink};
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    fn state() -> ApiState {
        let config = SensorConfig::default().with_port("/nonexistent/ttyAMA0");
        let (handle, _requests) = display::channel();
        let engine = Arc::new(PresenceEngine::new(&config, handle));
        let link = Arc::new(SensorLink::new(
            config.clone(),
            Arc::new(NativeSerialOpener),
            engine.clone(),
            CancellationToken::new(),
        ));
        let controller = Arc::new(DisplayController::new(Arc::new(LogOnlyPower), None, true));
        ApiState::new(StatusService::new(engine, link, &config), controller)
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (code, json) = call(router(state()), "GET", "/api/presence/status").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["present"], false);
        assert_eq!(json["displayOn"], true);
        assert_eq!(json["connectionStatus"], "disconnected");
        assert_eq!(json["port"], "/nonexistent/ttyAMA0");
        assert!(json["lastError"].is_null());
    }

    #[tokio::test]
    async fn test_trigger_endpoint() {
        let app = router(state());
        let (code, json) = call(app.clone(), "POST", "/api/presence/trigger").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["present"], true);
        assert_eq!(json["secondsSincePresence"], 0);

        let (_, json) = call(app, "GET", "/api/presence/status").await;
        assert_eq!(json["present"], true);
    }

    #[tokio::test]
    async fn test_disable_endpoint() {
        let (code, json) = call(router(state()), "POST", "/api/presence/disable").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(json["disabled"], true);
        assert_eq!(json["displayOn"], true);
    }

    #[tokio::test]
    async fn test_trigger_requires_post() {
        let response = router(state())
            .oneshot(
                Request::builder()
                    .uri("/api/presence/trigger")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_events_stream_display_changes() {
        let state = state();
        let controller = state.display.clone();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/presence/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        controller.set_display(false).await;

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: presence-lost"));
    }

    #[tokio::test]
    async fn test_shutdown_completes_with_open_event_stream() {
        let cancel = CancellationToken::new();
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (addr, handle) = start(bind, state(), cancel.clone()).await.unwrap();

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /api/presence/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut head = [0u8; 256];
        let n = client.read(&mut head).await.unwrap();
        assert!(String::from_utf8_lossy(&head[..n]).starts_with("HTTP/1.1 200"));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server kept running with a subscriber attached")
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_skips_taken_port() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken_addr = taken.local_addr().unwrap();
        let cancel = CancellationToken::new();

        let (addr, handle) = start(taken_addr, state(), cancel.clone()).await.unwrap();
        assert_ne!(addr.port(), taken_addr.port());
        assert!(addr.port() > taken_addr.port());
        assert!(addr.port() < taken_addr.port() + PORT_ATTEMPTS);

        cancel.cancel();
        handle.await.unwrap();
    }
}
