//! EAR (Eye Aspect Ratio) 计算
//!
//! 标准6点公式: EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)
//! - p1, p4: 眼角点（水平方向）
//! - p2, p3: 上眼睑点
//! - p5, p6: 下眼睑点
//!
//! 睁眼时 EAR 约 0.25-0.35，闭眼时趋近于 0。

use crate::constants::{LEFT_EYE, RIGHT_EYE};

use super::{FaceShape, Point};

/// 水平距离低于此值视为退化输入
const MIN_HORIZONTAL: f64 = 1e-6;

/// 双眼 EAR 结果，同时保留眼部轮廓用于绘制
#[derive(Debug, Clone, PartialEq)]
pub struct EyeMeasurement {
    /// 左右眼 EAR 的平均值
    pub ear: f64,
    pub left_ear: f64,
    pub right_ear: f64,
    pub left_eye: [Point; 6],
    pub right_eye: [Point; 6],
}

/// 单眼6点 EAR
///
/// 点序与 68 点模型一致：p[0]、p[3] 为眼角，p[1]/p[2] 为上眼睑，p[4]/p[5] 为下眼睑。
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f64 {
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal < MIN_HORIZONTAL {
        return 0.0;
    }

    let vertical1 = eye[1].distance(&eye[5]);
    let vertical2 = eye[2].distance(&eye[4]);
    (vertical1 + vertical2) / (2.0 * horizontal)
}

/// 双眼联合计算：分别计算左右眼 EAR 后取平均
pub fn final_ear(shape: &FaceShape) -> EyeMeasurement {
    let left_eye = eye_points(shape, LEFT_EYE.start);
    let right_eye = eye_points(shape, RIGHT_EYE.start);

    let left_ear = eye_aspect_ratio(&left_eye);
    let right_ear = eye_aspect_ratio(&right_eye);

    EyeMeasurement {
        ear: (left_ear + right_ear) / 2.0,
        left_ear,
        right_ear,
        left_eye,
        right_eye,
    }
}

fn eye_points(shape: &FaceShape, start: usize) -> [Point; 6] {
    let region = shape.region(start..start + 6);
    [
        region[0], region[1], region[2], region[3], region[4], region[5],
    ]
}
