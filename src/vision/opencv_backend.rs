//! OpenCV 后端：VideoCapture 采集，Haar 级联检测人脸，LBF facemark 预测 68 点关键点。
//!
//! 需要启用 `opencv` feature，并在运行目录提供级联 XML 与 LBF 模型文件。

use std::path::Path;

use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Point2f, Ptr, Rect, Size, Vector};
use opencv::face::{self, Facemark};
use opencv::objdetect::{self, CascadeClassifier};
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use crate::config::CameraConfig;
use crate::constants::{CASCADE_MIN_FACE_PX, CASCADE_MIN_NEIGHBORS, CASCADE_SCALE_FACTOR};
use crate::signals::{FaceShape, Point};

use super::{
    FaceDetector, FaceRect, FrameSource, LandmarkPredictor, VisionBackend, VisionError,
    VisionSession,
};

#[derive(Debug, Clone)]
pub struct OpenCvBackend {
    cascade_path: String,
    landmark_model_path: String,
}

impl OpenCvBackend {
    pub fn new(cascade_path: &str, landmark_model_path: &str) -> Self {
        Self {
            cascade_path: cascade_path.to_string(),
            landmark_model_path: landmark_model_path.to_string(),
        }
    }

    fn load_cascade(&self) -> Result<CascadeClassifier, VisionError> {
        let model_err = |message: String| VisionError::Model {
            path: self.cascade_path.clone(),
            message,
        };
        if !Path::new(&self.cascade_path).exists() {
            return Err(model_err("file not found".to_string()));
        }
        let classifier =
            CascadeClassifier::new(&self.cascade_path).map_err(|e| model_err(e.to_string()))?;
        if classifier.empty().map_err(|e| model_err(e.to_string()))? {
            return Err(model_err("cascade is empty".to_string()));
        }
        Ok(classifier)
    }

    fn load_facemark(&self) -> Result<Ptr<Facemark>, VisionError> {
        let model_err = |message: String| VisionError::Model {
            path: self.landmark_model_path.clone(),
            message,
        };
        if !Path::new(&self.landmark_model_path).exists() {
            return Err(model_err("file not found".to_string()));
        }
        let mut facemark = face::create_facemark_lbf().map_err(|e| model_err(e.to_string()))?;
        facemark
            .load_model(&self.landmark_model_path)
            .map_err(|e| model_err(e.to_string()))?;
        Ok(facemark)
    }
}

impl VisionBackend for OpenCvBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn open(&self, camera: &CameraConfig) -> Result<VisionSession, VisionError> {
        // 先加载模型，避免模型缺失时白白占用摄像头
        let cascade = self.load_cascade()?;
        let facemark = self.load_facemark()?;

        tracing::info!(index = camera.index, "Opening camera");
        let unavailable = |message: String| VisionError::CameraUnavailable {
            index: camera.index,
            message,
        };
        let mut capture = videoio::VideoCapture::new(camera.index, videoio::CAP_ANY)
            .map_err(|e| unavailable(e.to_string()))?;
        if !capture.is_opened().map_err(|e| unavailable(e.to_string()))? {
            return Err(unavailable("device could not be opened".to_string()));
        }

        for (prop, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, f64::from(camera.width)),
            (videoio::CAP_PROP_FRAME_HEIGHT, f64::from(camera.height)),
            (videoio::CAP_PROP_FPS, f64::from(camera.fps)),
        ] {
            if let Err(e) = capture.set(prop, value) {
                tracing::warn!(prop, value, error = %e, "Camera rejected property");
            }
        }

        Ok(VisionSession {
            source: Box::new(OpenCvSource { capture }),
            detector: Box::new(CascadeDetector { cascade }),
            predictor: Box::new(LbfPredictor { facemark }),
        })
    }
}

struct OpenCvSource {
    capture: videoio::VideoCapture,
}

impl FrameSource for OpenCvSource {
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError> {
        let capture_err = |e: opencv::Error| VisionError::Capture(e.to_string());

        let mut bgr = Mat::default();
        let grabbed = self.capture.read(&mut bgr).map_err(capture_err)?;
        if !grabbed || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(capture_err)?;
        let rgb = if rgb.is_continuous() {
            rgb
        } else {
            rgb.try_clone().map_err(capture_err)?
        };

        let width = u32::try_from(rgb.cols()).map_err(|e| VisionError::Capture(e.to_string()))?;
        let height = u32::try_from(rgb.rows()).map_err(|e| VisionError::Capture(e.to_string()))?;
        let bytes = rgb.data_bytes().map_err(capture_err)?.to_vec();

        RgbImage::from_raw(width, height, bytes)
            .map(Some)
            .ok_or_else(|| VisionError::Capture("frame buffer size mismatch".to_string()))
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!(error = %e, "Failed to release camera");
        } else {
            tracing::info!("Camera released");
        }
    }
}

fn gray_to_mat(gray: &GrayImage) -> Result<Mat, opencv::Error> {
    let (w, h) = gray.dimensions();
    let view = Mat::new_rows_cols_with_data(h as i32, w as i32, gray.as_raw())?;
    view.try_clone()
}

struct CascadeDetector {
    cascade: CascadeClassifier,
}

impl FaceDetector for CascadeDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceRect>, VisionError> {
        let detect_err = |e: opencv::Error| VisionError::Detection(e.to_string());

        let mat = gray_to_mat(gray).map_err(detect_err)?;
        let mut faces = Vector::<Rect>::new();
        self.cascade
            .detect_multi_scale(
                &mat,
                &mut faces,
                CASCADE_SCALE_FACTOR,
                CASCADE_MIN_NEIGHBORS,
                objdetect::CASCADE_SCALE_IMAGE,
                Size::new(CASCADE_MIN_FACE_PX, CASCADE_MIN_FACE_PX),
                Size::new(0, 0),
            )
            .map_err(detect_err)?;

        Ok(faces
            .iter()
            .filter(|r| r.x >= 0 && r.y >= 0 && r.width > 0 && r.height > 0)
            .map(|r| FaceRect::new(r.x as u32, r.y as u32, r.width as u32, r.height as u32))
            .collect())
    }
}

struct LbfPredictor {
    facemark: Ptr<Facemark>,
}

impl LandmarkPredictor for LbfPredictor {
    fn predict(&mut self, gray: &GrayImage, face: FaceRect) -> Result<FaceShape, VisionError> {
        let landmark_err = |e: opencv::Error| VisionError::Landmarks(e.to_string());

        let mat = gray_to_mat(gray).map_err(landmark_err)?;
        let mut faces = Vector::<Rect>::new();
        faces.push(Rect::new(
            face.x as i32,
            face.y as i32,
            face.width as i32,
            face.height as i32,
        ));
        let mut landmarks = Vector::<Vector<Point2f>>::new();

        let fitted = self
            .facemark
            .fit(&mat, &faces, &mut landmarks)
            .map_err(landmark_err)?;
        if !fitted || landmarks.is_empty() {
            return Err(VisionError::Landmarks("facemark fit failed".to_string()));
        }

        let first = landmarks.get(0).map_err(landmark_err)?;
        let points: Vec<Point> = first
            .iter()
            .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
            .collect();
        FaceShape::from_points(&points).map_err(|e| VisionError::Landmarks(e.to_string()))
    }
}
