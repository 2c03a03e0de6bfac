use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_ANALYSIS_SIZE, DEFAULT_EAR_CONSEC_FRAMES, DEFAULT_EAR_THRESHOLD,
    DEFAULT_YAWN_THRESHOLD,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub static_dir: String,
    pub vision: VisionConfig,
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionBackendKind {
    Synthetic,
    OpenCv,
}

impl FromStr for VisionBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" | "mock" => Ok(Self::Synthetic),
            "opencv" => Ok(Self::OpenCv),
            other => Err(format!("unknown vision backend '{other}'")),
        }
    }
}

impl VisionBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::OpenCv => "opencv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub backend: String,
    pub cascade_path: String,
    pub landmark_model_path: String,
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub index: i32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub ear_threshold: f64,
    pub ear_consec_frames: u32,
    pub yawn_threshold: f64,
    pub analysis_size: u32,
    pub annotate_stream: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            ear_consec_frames: DEFAULT_EAR_CONSEC_FRAMES,
            yawn_threshold: DEFAULT_YAWN_THRESHOLD,
            analysis_size: DEFAULT_ANALYSIS_SIZE,
            annotate_stream: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub jpeg_quality: u8,
    pub stream_interval_ms: u64,
    pub sse_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            stream_interval_ms: 33,
            sse_interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 5000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "*"),
            static_dir: env_or("STATIC_DIR", "static"),
            vision: VisionConfig {
                backend: env_or("VISION_BACKEND", "synthetic"),
                cascade_path: env_or("CASCADE_PATH", "haarcascade_frontalface_default.xml"),
                landmark_model_path: env_or("LANDMARK_MODEL_PATH", "lbfmodel.yaml"),
            },
            camera: CameraConfig {
                index: env_or_parse("CAMERA_INDEX", 0_i32),
                width: env_or_parse("CAMERA_WIDTH", 640_u32),
                height: env_or_parse("CAMERA_HEIGHT", 480_u32),
                fps: env_or_parse("CAMERA_FPS", 30_u32).max(1),
            },
            detection: DetectionConfig {
                ear_threshold: env_or_parse("EAR_THRESHOLD", DEFAULT_EAR_THRESHOLD),
                ear_consec_frames: env_or_parse("EAR_CONSEC_FRAMES", DEFAULT_EAR_CONSEC_FRAMES),
                yawn_threshold: env_or_parse("YAWN_THRESHOLD", DEFAULT_YAWN_THRESHOLD),
                analysis_size: env_or_parse("ANALYSIS_SIZE", DEFAULT_ANALYSIS_SIZE).max(1),
                annotate_stream: env_or_bool("ANNOTATE_STREAM", true),
            },
            stream: StreamConfig {
                jpeg_quality: env_or_parse("JPEG_QUALITY", 80_u8).clamp(1, 100),
                stream_interval_ms: env_or_parse("STREAM_INTERVAL_MS", 33_u64).max(1),
                sse_interval_ms: env_or_parse("SSE_INTERVAL_MS", 1000_u64).max(1),
            },
        }
    }

    pub fn backend_kind(&self) -> Result<VisionBackendKind, String> {
        self.vision.backend.parse()
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "VISION_BACKEND",
            "CAMERA_FPS",
            "EAR_THRESHOLD",
            "EAR_CONSEC_FRAMES",
            "YAWN_THRESHOLD",
            "JPEG_QUALITY",
            "ANNOTATE_STREAM",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.detection.ear_threshold, 0.3);
        assert_eq!(cfg.detection.ear_consec_frames, 30);
        assert_eq!(cfg.detection.yawn_threshold, 20.0);
        assert_eq!(cfg.camera.fps, 30);
        assert_eq!(cfg.backend_kind(), Ok(VisionBackendKind::Synthetic));
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
        clear_keys(managed_keys());

        env::set_var("PORT", "8080");
        env::set_var("EAR_THRESHOLD", "0.25");
        env::set_var("EAR_CONSEC_FRAMES", "12");
        env::set_var("YAWN_THRESHOLD", "18.5");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.detection.ear_threshold, 0.25);
        assert_eq!(cfg.detection.ear_consec_frames, 12);
        assert_eq!(cfg.detection.yawn_threshold, 18.5);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("CAMERA_FPS", "0");
        env::set_var("JPEG_QUALITY", "250");
        env::set_var("ANNOTATE_STREAM", "maybe");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.camera.fps, 1);
        assert_eq!(cfg.stream.jpeg_quality, 80);
        assert!(cfg.detection.annotate_stream);
        clear_keys(managed_keys());
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("OpenCV".parse(), Ok(VisionBackendKind::OpenCv));
        assert_eq!(" synthetic ".parse(), Ok(VisionBackendKind::Synthetic));
        assert!("v4l".parse::<VisionBackendKind>().is_err());
    }
}
