//! 采集与人脸/关键点检测
//!
//! 采集循环只依赖本模块的 trait。每次启动检测由 [`VisionBackend`] 打开一个
//! [`VisionSession`]，session 持有摄像头直到被释放。

pub mod overlay;
pub mod synthetic;

#[cfg(feature = "opencv")]
pub mod opencv_backend;

use std::sync::Arc;

use image::{GrayImage, RgbImage};
use thiserror::Error;

use crate::config::{CameraConfig, Config, VisionBackendKind};
use crate::signals::FaceShape;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("camera {index} unavailable: {message}")]
    CameraUnavailable { index: i32, message: String },
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("failed to load model {path}: {message}")]
    Model { path: String, message: String },
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("landmark prediction failed: {0}")]
    Landmarks(String),
    #[error("vision backend '{0}' is not compiled in")]
    Unsupported(&'static str),
}

/// 人脸框（分析帧像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

pub trait FrameSource: Send {
    /// `Ok(None)` 表示本次没有拿到帧
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError>;
}

pub trait FaceDetector: Send {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceRect>, VisionError>;
}

pub trait LandmarkPredictor: Send {
    fn predict(&mut self, gray: &GrayImage, face: FaceRect) -> Result<FaceShape, VisionError>;
}

pub struct VisionSession {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    pub predictor: Box<dyn LandmarkPredictor>,
}

pub trait VisionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// 打开摄像头并加载模型，阻塞调用
    fn open(&self, camera: &CameraConfig) -> Result<VisionSession, VisionError>;
}

/// 按 `VISION_BACKEND` 选择后端
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn VisionBackend>, String> {
    match config.backend_kind()? {
        VisionBackendKind::Synthetic => Ok(Arc::new(synthetic::SyntheticBackend::demo())),
        VisionBackendKind::OpenCv => opencv_from_config(config),
    }
}

#[cfg(feature = "opencv")]
fn opencv_from_config(config: &Config) -> Result<Arc<dyn VisionBackend>, String> {
    Ok(Arc::new(opencv_backend::OpenCvBackend::new(
        &config.vision.cascade_path,
        &config.vision.landmark_model_path,
    )))
}

#[cfg(not(feature = "opencv"))]
fn opencv_from_config(_config: &Config) -> Result<Arc<dyn VisionBackend>, String> {
    Err(VisionError::Unsupported(VisionBackendKind::OpenCv.as_str()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_is_default_backend() {
        let mut cfg = Config::from_env();
        cfg.vision.backend = "synthetic".to_string();
        let backend = backend_from_config(&cfg).expect("backend");
        assert_eq!(backend.name(), "synthetic");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut cfg = Config::from_env();
        cfg.vision.backend = "gstreamer".to_string();
        assert!(backend_from_config(&cfg).is_err());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn opencv_requires_feature() {
        let mut cfg = Config::from_env();
        cfg.vision.backend = "opencv".to_string();
        let err = backend_from_config(&cfg).err().expect("should fail");
        assert!(err.contains("not compiled in"));
    }
}
