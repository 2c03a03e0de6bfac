use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// 已编码为 JPEG 的最新一帧
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub seq: u64,
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

/// 单槽帧缓冲：采集线程写入，视频流读取
#[derive(Debug, Default)]
pub struct FrameBuffer {
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    next_seq: u64,
    frame: Option<Arc<EncodedFrame>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 返回分配给该帧的序号
    pub fn publish(&self, jpeg: Vec<u8>, width: u32, height: u32) -> u64 {
        let mut slot = self.lock();
        slot.next_seq += 1;
        let seq = slot.next_seq;
        slot.frame = Some(Arc::new(EncodedFrame {
            seq,
            jpeg: Bytes::from(jpeg),
            width,
            height,
            captured_at: Utc::now(),
        }));
        seq
    }

    pub fn latest(&self) -> Option<Arc<EncodedFrame>> {
        self.lock().frame.clone()
    }

    /// 清空当前帧；序号继续递增，避免重启后与旧帧序号冲突
    pub fn clear(&self) {
        self.lock().frame = None;
    }
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::with_capacity(64 * 1024));
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    frame.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn publish_replaces_previous_frame() {
        let buffer = FrameBuffer::new();
        assert!(buffer.latest().is_none());

        let first = buffer.publish(vec![1], 2, 2);
        let second = buffer.publish(vec![2], 2, 2);
        assert!(second > first);

        let latest = buffer.latest().expect("frame");
        assert_eq!(latest.seq, second);
        assert_eq!(latest.jpeg.as_ref(), &[2]);
    }

    #[test]
    fn clear_keeps_sequence_monotonic() {
        let buffer = FrameBuffer::new();
        let before = buffer.publish(vec![1], 1, 1);
        buffer.clear();
        assert!(buffer.latest().is_none());
        assert!(buffer.publish(vec![1], 1, 1) > before);
    }

    #[test]
    fn jpeg_encoding_produces_decodable_image() {
        let img = RgbImage::from_pixel(32, 24, Rgb([10, 200, 30]));
        let bytes = encode_jpeg(&img, 80).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }
}
