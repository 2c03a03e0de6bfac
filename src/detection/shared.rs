use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::config::DetectionConfig;
use crate::signals::{EyeStatus, YawnStatus};

use super::frame_buffer::FrameBuffer;

/// `/api/metrics` 的返回体，字段名与前端约定一致
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub ear: f64,
    pub yawn_distance: f64,
    pub eye_status: EyeStatus,
    pub yawn_status: YawnStatus,
    pub face_detected: bool,
    pub frames_processed: u64,
    pub drowsy_events: u64,
    pub yawn_events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionSettings {
    pub ear_threshold: f64,
    pub yawn_threshold: f64,
    pub ear_consec_frames: u32,
}

impl From<&DetectionConfig> for DetectionSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            yawn_threshold: config.yawn_threshold,
            ear_consec_frames: config.ear_consec_frames,
        }
    }
}

/// 采集线程与 HTTP 处理共享的状态
#[derive(Debug)]
pub struct DetectionShared {
    metrics: RwLock<Metrics>,
    settings: RwLock<DetectionSettings>,
    settings_version: AtomicU64,
    frames: FrameBuffer,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl DetectionShared {
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            metrics: RwLock::new(Metrics::default()),
            settings: RwLock::new(settings),
            settings_version: AtomicU64::new(0),
            frames: FrameBuffer::new(),
        }
    }

    pub fn metrics(&self) -> Metrics {
        read(&self.metrics).clone()
    }

    pub fn publish_metrics(&self, metrics: Metrics) {
        *write(&self.metrics) = metrics;
    }

    pub fn reset_metrics(&self) {
        *write(&self.metrics) = Metrics::default();
    }

    pub fn settings(&self) -> DetectionSettings {
        *read(&self.settings)
    }

    pub fn settings_version(&self) -> u64 {
        self.settings_version.load(Ordering::Acquire)
    }

    pub fn update_settings(&self, settings: DetectionSettings) {
        *write(&self.settings) = settings;
        self.settings_version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn frames(&self) -> &FrameBuffer {
        &self.frames
    }
}
