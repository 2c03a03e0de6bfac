//! MJPEG 视频流
//!
//! `multipart/x-mixed-replace` 每个分段是一张 JPEG。按固定间隔轮询帧缓冲，
//! 只在出现新帧时推送；检测停止期间连接保持空闲，服务关闭时结束。

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use tokio::time::MissedTickBehavior;

use crate::constants::MJPEG_BOUNDARY;
use crate::detection::EncodedFrame;
use crate::state::AppState;

pub async fn video_feed(State(state): State<AppState>) -> Response {
    let interval = Duration::from_millis(state.config().stream.stream_interval_ms);
    let mut shutdown_rx = state.shutdown_rx();

    let stream = async_stream::stream! {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_seq = 0_u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(frame) = state.shared().frames().latest() else {
                        continue;
                    };
                    if frame.seq == last_seq {
                        continue;
                    }
                    last_seq = frame.seq;
                    yield Ok::<Bytes, Infallible>(multipart_chunk(&frame));
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    };

    let content_type = format!("multipart/x-mixed-replace; boundary={MJPEG_BOUNDARY}");
    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    response
}

pub fn multipart_chunk(frame: &EncodedFrame) -> Bytes {
    let head = format!("--{MJPEG_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut chunk = Vec::with_capacity(head.len() + frame.jpeg.len() + 2);
    chunk.extend_from_slice(head.as_bytes());
    chunk.extend_from_slice(&frame.jpeg);
    chunk.extend_from_slice(b"\r\n");
    Bytes::from(chunk)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn chunk_layout() {
        let frame = EncodedFrame {
            seq: 1,
            jpeg: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
            width: 1,
            height: 1,
            captured_at: Utc::now(),
        };
        let chunk = multipart_chunk(&frame);
        let expected: &[u8] =
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n";
        assert_eq!(chunk.as_ref(), expected);
    }
}
