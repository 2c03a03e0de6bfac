use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{CameraConfig, DetectionConfig};
use crate::vision::VisionBackend;

use super::shared::DetectionShared;
use super::worker::{DetectionLoop, FrameAnalyzer};
use super::DetectionError;

const WORKER_THREAD_NAME: &str = "detection-loop";

struct ActiveRun {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

impl ActiveRun {
    fn is_alive(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionStatus {
    pub running: bool,
    pub backend: &'static str,
    pub started_at: Option<DateTime<Utc>>,
    /// 帧缓冲中最新一帧的采集时间
    pub last_frame_at: Option<DateTime<Utc>>,
    pub frames_processed: u64,
    pub drowsy_events: u64,
    pub yawn_events: u64,
}

/// 启停采集循环；同一时刻最多一个运行实例
pub struct DetectionController {
    backend: Arc<dyn VisionBackend>,
    camera: CameraConfig,
    detection: DetectionConfig,
    jpeg_quality: u8,
    shared: Arc<DetectionShared>,
    run: Mutex<Option<ActiveRun>>,
}

impl DetectionController {
    pub fn new(
        backend: Arc<dyn VisionBackend>,
        camera: CameraConfig,
        detection: DetectionConfig,
        jpeg_quality: u8,
        shared: Arc<DetectionShared>,
    ) -> Self {
        Self {
            backend,
            camera,
            detection,
            jpeg_quality,
            shared,
            run: Mutex::new(None),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn start(&self) -> Result<(), DetectionError> {
        let mut slot = self.run.lock().await;

        if slot.as_ref().is_some_and(ActiveRun::is_alive) {
            return Err(DetectionError::AlreadyRunning);
        }
        // 上一轮线程已退出（或异常结束），先回收，确保相机已释放
        if let Some(previous) = slot.take() {
            previous.running.store(false, Ordering::Release);
            join_worker(previous.handle).await;
        }

        let backend = self.backend.clone();
        let camera = self.camera.clone();
        let session = tokio::task::spawn_blocking(move || backend.open(&camera))
            .await
            .map_err(|e| DetectionError::Join(e.to_string()))??;

        self.shared.reset_metrics();
        self.shared.frames().clear();

        // 先取版本号再取设置：两次读取之间的更新会在第一帧前被重新应用
        let settings_version = self.shared.settings_version();
        let settings = self.shared.settings();
        let analyzer = FrameAnalyzer::new(
            session.detector,
            session.predictor,
            &settings,
            self.detection.analysis_size,
            self.detection.annotate_stream,
        );
        let running = Arc::new(AtomicBool::new(true));
        let worker = DetectionLoop {
            source: session.source,
            analyzer,
            shared: self.shared.clone(),
            running: running.clone(),
            jpeg_quality: self.jpeg_quality,
            settings_version,
        };

        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())?;

        *slot = Some(ActiveRun {
            running,
            handle,
            started_at: Utc::now(),
        });
        tracing::info!(backend = self.backend.name(), "Detection started");
        Ok(())
    }

    /// 返回停止前是否在运行；未运行时为空操作
    pub async fn stop(&self) -> bool {
        let mut slot = self.run.lock().await;
        let Some(run) = slot.take() else {
            return false;
        };

        let was_alive = run.is_alive();
        run.running.store(false, Ordering::Release);
        join_worker(run.handle).await;
        self.shared.frames().clear();

        tracing::info!("Detection stopped");
        was_alive
    }

    pub async fn is_running(&self) -> bool {
        self.run
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveRun::is_alive)
    }

    pub async fn status(&self) -> DetectionStatus {
        let (running, started_at) = {
            let slot = self.run.lock().await;
            match slot.as_ref() {
                Some(run) => (run.is_alive(), Some(run.started_at)),
                None => (false, None),
            }
        };
        let metrics = self.shared.metrics();

        DetectionStatus {
            running,
            backend: self.backend.name(),
            started_at,
            last_frame_at: self.shared.frames().latest().map(|f| f.captured_at),
            frames_processed: metrics.frames_processed,
            drowsy_events: metrics.drowsy_events,
            yawn_events: metrics.yawn_events,
        }
    }
}

async fn join_worker(handle: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => tracing::error!("Detection thread panicked"),
        Err(e) => tracing::error!(error = %e, "Failed to join detection thread"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::detection::shared::DetectionSettings;
    use crate::vision::synthetic::{SyntheticBackend, SyntheticFace, SyntheticScript};

    fn controller(backend: SyntheticBackend) -> (DetectionController, Arc<DetectionShared>) {
        controller_at(backend, 200)
    }

    fn controller_at(
        backend: SyntheticBackend,
        fps: u32,
    ) -> (DetectionController, Arc<DetectionShared>) {
        let detection = DetectionConfig::default();
        let shared = Arc::new(DetectionShared::new(DetectionSettings::from(&detection)));
        let camera = CameraConfig {
            fps,
            ..CameraConfig::default()
        };
        (
            DetectionController::new(Arc::new(backend), camera, detection, 75, shared.clone()),
            shared,
        )
    }

    fn alert_backend() -> SyntheticBackend {
        SyntheticBackend::new(SyntheticScript::new().face(SyntheticFace::ALERT, 1))
    }

    async fn wait_for_frames(shared: &DetectionShared, n: u64) {
        for _ in 0..300 {
            if shared.metrics().frames_processed >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("detection loop produced no frames");
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (ctl, shared) = controller(alert_backend());
        ctl.start().await.expect("first start");
        assert!(matches!(
            ctl.start().await,
            Err(DetectionError::AlreadyRunning)
        ));
        wait_for_frames(&shared, 1).await;
        assert!(ctl.stop().await);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_clears_frame() {
        let (ctl, shared) = controller(alert_backend());
        assert!(!ctl.stop().await);

        ctl.start().await.unwrap();
        wait_for_frames(&shared, 2).await;
        assert!(shared.frames().latest().is_some());
        assert!(ctl.status().await.last_frame_at.is_some());

        assert!(ctl.stop().await);
        assert!(!ctl.is_running().await);
        assert!(shared.frames().latest().is_none());
        assert!(ctl.status().await.last_frame_at.is_none());
        assert!(!ctl.stop().await);
    }

    #[tokio::test]
    async fn restart_resets_metrics() {
        // 5 fps：重启后短时间内最多处理一帧
        let closed = SyntheticBackend::new(SyntheticScript::new().face(SyntheticFace::EYES_CLOSED, 1));
        let (ctl, shared) = controller_at(closed, 5);
        shared.update_settings(DetectionSettings {
            ear_consec_frames: 2,
            ..shared.settings()
        });

        ctl.start().await.unwrap();
        for _ in 0..300 {
            if shared.metrics().drowsy_events == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        ctl.stop().await;
        let before = shared.metrics();
        assert_eq!(before.drowsy_events, 1);
        assert!(before.frames_processed >= 2);

        ctl.start().await.unwrap();
        let after = shared.metrics();
        assert_eq!(after.drowsy_events, 0);
        assert!(after.frames_processed <= 1);
        assert_ne!(after.eye_status, crate::signals::EyeStatus::Drowsy);

        let status = ctl.status().await;
        assert!(status.running);
        assert!(status.started_at.is_some());
        ctl.stop().await;
    }

    #[tokio::test]
    async fn settings_posted_right_after_start_take_effect() {
        let (ctl, shared) = controller(alert_backend());
        ctl.start().await.unwrap();
        shared.update_settings(DetectionSettings {
            ear_threshold: 0.5,
            ear_consec_frames: 1,
            ..shared.settings()
        });

        for _ in 0..300 {
            if shared.metrics().eye_status == crate::signals::EyeStatus::Drowsy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(shared.metrics().eye_status, crate::signals::EyeStatus::Drowsy);
        ctl.stop().await;
    }

    #[tokio::test]
    async fn camera_failure_is_reported() {
        let (ctl, _) = controller(SyntheticBackend::unavailable());
        let err = ctl.start().await.unwrap_err();
        assert!(matches!(err, DetectionError::Vision(_)));
        assert!(!ctl.is_running().await);
    }
}
