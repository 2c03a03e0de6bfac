use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;

use drowsiness_monitor::config::{
    CameraConfig, Config, DetectionConfig, StreamConfig, VisionConfig,
};
use drowsiness_monitor::routes::build_router;
use drowsiness_monitor::state::AppState;
use drowsiness_monitor::vision::synthetic::{SyntheticBackend, SyntheticFace, SyntheticScript};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

// 直接构造 Config，避免 set_var 造成多线程测试环境变量竞态
pub fn test_config() -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        port: 5000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "*".to_string(),
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string(),
        vision: VisionConfig {
            backend: "synthetic".to_string(),
            cascade_path: String::new(),
            landmark_model_path: String::new(),
        },
        camera: CameraConfig {
            index: 0,
            width: 160,
            height: 120,
            fps: 200,
        },
        detection: DetectionConfig {
            ear_consec_frames: 5,
            ..DetectionConfig::default()
        },
        stream: StreamConfig {
            jpeg_quality: 60,
            stream_interval_ms: 10,
            sse_interval_ms: 20,
        },
    }
}

pub fn spawn_with_backend(backend: SyntheticBackend) -> TestApp {
    let config = test_config();
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, Arc::new(backend), shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub fn spawn_with_script(script: SyntheticScript) -> TestApp {
    spawn_with_backend(SyntheticBackend::new(script))
}

pub fn spawn_test_app() -> TestApp {
    spawn_with_script(SyntheticScript::new().face(SyntheticFace::ALERT, 1))
}
