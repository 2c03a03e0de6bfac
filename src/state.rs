use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::detection::{DetectionController, DetectionSettings, DetectionShared};
use crate::vision::VisionBackend;

#[derive(Clone)]
pub struct AppState {
    detection: Arc<DetectionController>,
    shared: Arc<DetectionShared>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: &Config,
        backend: Arc<dyn VisionBackend>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let shared = Arc::new(DetectionShared::new(DetectionSettings::from(
            &config.detection,
        )));
        let detection = Arc::new(DetectionController::new(
            backend,
            config.camera.clone(),
            config.detection.clone(),
            config.stream.jpeg_quality,
            shared.clone(),
        ));

        Self {
            detection,
            shared,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn detection(&self) -> &DetectionController {
        &self.detection
    }

    pub fn shared(&self) -> &DetectionShared {
        &self.shared
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
