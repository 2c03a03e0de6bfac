use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::constants::{OUTER_LIP, OVERLAY_COLOR};
use crate::signals::{EyeMeasurement, FaceShape, Point};

/// 绘制双眼与外唇轮廓（1px 闭合折线）
///
/// `scale` 把分析帧坐标映射到 `frame` 上
pub fn draw_face_overlay(
    frame: &mut RgbImage,
    eyes: &EyeMeasurement,
    shape: &FaceShape,
    scale: (f64, f64),
) {
    let color = Rgb(OVERLAY_COLOR);
    let (sx, sy) = scale;
    let map = |pts: &[Point]| -> Vec<(f32, f32)> {
        pts.iter()
            .map(|p| ((p.x * sx) as f32, (p.y * sy) as f32))
            .collect()
    };

    draw_closed_contour(frame, &map(&eyes.left_eye), color);
    draw_closed_contour(frame, &map(&eyes.right_eye), color);
    draw_closed_contour(frame, &map(shape.region(OUTER_LIP)), color);
}

fn draw_closed_contour(frame: &mut RgbImage, contour: &[(f32, f32)], color: Rgb<u8>) {
    if contour.len() < 2 {
        return;
    }
    for (i, &start) in contour.iter().enumerate() {
        let end = contour[(i + 1) % contour.len()];
        draw_line_segment_mut(frame, start, end, color);
    }
}
