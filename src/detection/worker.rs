//! 采集循环
//!
//! 单个 OS 线程：读帧 → 缩放/灰度 → 人脸与关键点 → EAR/唇距判定 → 发布指标和 JPEG 帧。
//! 相机无帧或单帧出错时记录日志、短暂休眠后继续，不退出循环。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::constants::{FRAME_LOG_EVERY, FRAME_RETRY_DELAY_MS};
use crate::signals::{
    final_ear, lip_distance, EyeClassifier, EyeStatus, YawnClassifier, YawnStatus,
};
use crate::vision::overlay::draw_face_overlay;
use crate::vision::{FaceDetector, FrameSource, LandmarkPredictor, VisionError};

use super::frame_buffer::encode_jpeg;
use super::shared::{DetectionSettings, DetectionShared, Metrics};

/// 单帧分析结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub metrics: Metrics,
    pub alarm_raised: bool,
    pub yawn_started: bool,
}

pub struct FrameAnalyzer {
    detector: Box<dyn FaceDetector>,
    predictor: Box<dyn LandmarkPredictor>,
    eye: EyeClassifier,
    yawn: YawnClassifier,
    analysis_size: u32,
    annotate: bool,
    metrics: Metrics,
}

impl FrameAnalyzer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        predictor: Box<dyn LandmarkPredictor>,
        settings: &DetectionSettings,
        analysis_size: u32,
        annotate: bool,
    ) -> Self {
        Self {
            detector,
            predictor,
            eye: EyeClassifier::new(settings.ear_threshold, settings.ear_consec_frames),
            yawn: YawnClassifier::new(settings.yawn_threshold),
            analysis_size: analysis_size.max(1),
            annotate,
            metrics: Metrics::default(),
        }
    }

    pub fn apply_settings(&mut self, settings: &DetectionSettings) {
        self.eye
            .set_thresholds(settings.ear_threshold, settings.ear_consec_frames);
        self.yawn.set_threshold(settings.yawn_threshold);
    }

    /// 分析一帧；开启标注时在 `frame` 上绘制眼部与嘴唇轮廓
    pub fn analyze(&mut self, frame: &mut RgbImage) -> Result<FrameOutcome, VisionError> {
        let size = self.analysis_size;
        let analysis = imageops::resize(frame, size, size, FilterType::Triangle);
        let gray = imageops::grayscale(&analysis);

        let faces = self.detector.detect(&gray)?;
        let scale = (
            f64::from(frame.width()) / f64::from(size),
            f64::from(frame.height()) / f64::from(size),
        );

        let mut alarm_raised = false;
        let mut yawn_started = false;
        self.metrics.face_detected = !faces.is_empty();

        // 多张人脸时按检测顺序处理，最后一张的结果生效
        for face in faces {
            let shape = self.predictor.predict(&gray, face)?;
            let eyes = final_ear(&shape);
            let distance = lip_distance(&shape);

            self.metrics.ear = eyes.ear;
            self.metrics.yawn_distance = distance;

            let eye = self.eye.update(eyes.ear);
            self.metrics.eye_status = eye.status;
            if eye.alarm_raised {
                alarm_raised = true;
                self.metrics.drowsy_events += 1;
            }

            let yawn = self.yawn.update(distance);
            self.metrics.yawn_status = yawn.status;
            if yawn.yawn_started {
                yawn_started = true;
                self.metrics.yawn_events += 1;
            }

            if self.annotate {
                draw_face_overlay(frame, &eyes, &shape, scale);
            }
        }

        if !self.metrics.face_detected {
            self.metrics.eye_status = EyeStatus::NoFace;
            self.metrics.yawn_status = YawnStatus::NoFace;
        }
        self.metrics.frames_processed += 1;

        Ok(FrameOutcome {
            metrics: self.metrics.clone(),
            alarm_raised,
            yawn_started,
        })
    }
}

pub(crate) struct DetectionLoop {
    pub source: Box<dyn FrameSource>,
    pub analyzer: FrameAnalyzer,
    pub shared: Arc<DetectionShared>,
    pub running: Arc<AtomicBool>,
    pub jpeg_quality: u8,
    /// 构建 analyzer 时所用设置的版本号
    pub settings_version: u64,
}

impl DetectionLoop {
    pub fn run(mut self) {
        tracing::info!("Video stream started");
        let retry_delay = Duration::from_millis(FRAME_RETRY_DELAY_MS);
        let mut settings_version = self.settings_version;
        let mut frame_count: u64 = 0;

        while self.running.load(Ordering::Acquire) {
            let current = self.shared.settings_version();
            if current != settings_version {
                settings_version = current;
                let settings = self.shared.settings();
                self.analyzer.apply_settings(&settings);
                tracing::info!(?settings, "Detection settings applied");
            }

            let mut frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::warn!("No frame received from camera");
                    std::thread::sleep(retry_delay);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Frame capture failed");
                    std::thread::sleep(retry_delay);
                    continue;
                }
            };

            frame_count += 1;
            if frame_count % FRAME_LOG_EVERY == 0 {
                tracing::debug!(frame_count, "Processing frame");
            }

            let analysed = match self.analyzer.analyze(&mut frame) {
                Ok(outcome) => {
                    self.report(&outcome);
                    self.shared.publish_metrics(outcome.metrics);
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Frame analysis failed");
                    false
                }
            };

            match encode_jpeg(&frame, self.jpeg_quality) {
                Ok(jpeg) => {
                    self.shared
                        .frames()
                        .publish(jpeg, frame.width(), frame.height());
                }
                Err(e) => tracing::warn!(error = %e, "JPEG encoding failed"),
            }

            if !analysed {
                std::thread::sleep(retry_delay);
            }
        }

        // source 在此处释放，相机随之关闭
        drop(self.source);
        tracing::info!(frame_count, "Video stream stopped");
    }

    fn report(&self, outcome: &FrameOutcome) {
        if outcome.alarm_raised {
            tracing::warn!(
                ear = outcome.metrics.ear,
                events = outcome.metrics.drowsy_events,
                "Drowsiness alert"
            );
        }
        if outcome.yawn_started {
            tracing::warn!(
                yawn_distance = outcome.metrics.yawn_distance,
                events = outcome.metrics.yawn_events,
                "Yawn detected"
            );
        }
    }
}
