//! 基于面部关键点的疲劳信号
//!
//! ## 模块
//! - `ear`: EAR (Eye Aspect Ratio) 眼部纵横比
//! - `mouth`: 上下唇间距，用于哈欠判定
//! - `classifier`: 阈值判定与连续帧计数

pub mod classifier;
pub mod ear;
pub mod mouth;

use std::ops::Range;

use crate::constants::LANDMARK_COUNT;

pub use classifier::{EyeClassifier, EyeStatus, EyeUpdate, YawnClassifier, YawnStatus, YawnUpdate};
pub use ear::{eye_aspect_ratio, final_ear, EyeMeasurement};
pub use mouth::lip_distance;

/// 二维点（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }
}

/// 68 点面部关键点
#[derive(Debug, Clone, PartialEq)]
pub struct FaceShape {
    points: [Point; LANDMARK_COUNT],
}

#[derive(Debug, thiserror::Error)]
#[error("expected 68 landmarks, got {0}")]
pub struct ShapeError(pub usize);

impl FaceShape {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn from_points(points: &[Point]) -> Result<Self, ShapeError> {
        let points: [Point; LANDMARK_COUNT] =
            points.try_into().map_err(|_| ShapeError(points.len()))?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn region(&self, range: Range<usize>) -> &[Point] {
        &self.points[range]
    }

    /// 按比例映射到另一分辨率（分析帧 → 原始帧）
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            points: self.points.map(|p| p.scaled(sx, sy)),
        }
    }
}
