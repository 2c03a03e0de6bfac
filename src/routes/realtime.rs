use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;

use crate::detection::Metrics;
use crate::response::AppError;
use crate::state::AppState;

const MAX_SSE_CONNECTIONS: usize = 32;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;

impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(metrics_events))
}

/// 推送指标变化（event: metrics），替代前端每秒轮询
pub async fn metrics_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= MAX_SSE_CONNECTIONS {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::service_unavailable(
            "TOO_MANY_STREAMS",
            "Too many event streams",
        ));
    }
    let guard = SseGuard;

    let interval = Duration::from_millis(state.config().stream.sse_interval_ms);
    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let _guard = guard;
        let mut ticker = tokio::time::interval(interval);
        let mut last: Option<Metrics> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let metrics = state.shared().metrics();
                    if last.as_ref() == Some(&metrics) {
                        continue;
                    }
                    match serde_json::to_string(&metrics) {
                        Ok(json) => yield Ok(Event::default().event("metrics").data(json)),
                        Err(e) => tracing::warn!(error = %e, "Failed to serialize metrics event"),
                    }
                    last = Some(metrics);
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
