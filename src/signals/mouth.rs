//! 唇距计算
//!
//! 上唇取外缘 50-52 与内缘 61-63 共 6 点，下唇取外缘 56-58 与内缘 65-67 共 6 点，
//! 分别求均值后取 y 方向差的绝对值。张嘴越大，距离越大。

use crate::constants::{LOW_LIP_INNER, LOW_LIP_OUTER, TOP_LIP_INNER, TOP_LIP_OUTER};

use super::{FaceShape, Point};

pub fn lip_distance(shape: &FaceShape) -> f64 {
    let top = mean(
        shape
            .region(TOP_LIP_OUTER)
            .iter()
            .chain(shape.region(TOP_LIP_INNER)),
    );
    let low = mean(
        shape
            .region(LOW_LIP_OUTER)
            .iter()
            .chain(shape.region(LOW_LIP_INNER)),
    );

    (top.y - low.y).abs()
}

fn mean<'a>(points: impl Iterator<Item = &'a Point>) -> Point {
    let (sum, count) = points.fold((Point::default(), 0usize), |(acc, n), p| {
        (Point::new(acc.x + p.x, acc.y + p.y), n + 1)
    });
    if count == 0 {
        return Point::default();
    }
    Point::new(sum.x / count as f64, sum.y / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LANDMARK_COUNT;

    fn shape_with_lips(top_y: f64, low_y: f64) -> FaceShape {
        let mut pts = [Point::new(0.0, 1000.0); LANDMARK_COUNT];
        for i in (50..53).chain(61..64) {
            pts[i] = Point::new(i as f64, top_y);
        }
        for i in (56..59).chain(65..68) {
            pts[i] = Point::new(i as f64, low_y);
        }
        FaceShape::new(pts)
    }

    #[test]
    fn distance_is_mean_vertical_gap() {
        assert!((lip_distance(&shape_with_lips(300.0, 325.0)) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn distance_ignores_orientation() {
        assert!((lip_distance(&shape_with_lips(325.0, 300.0)) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn other_mouth_points_do_not_contribute() {
        let mut shape = shape_with_lips(300.0, 304.0);
        // 48/54 嘴角点不参与计算
        let mut pts: Vec<Point> = shape.points().to_vec();
        pts[48] = Point::new(0.0, -500.0);
        pts[54] = Point::new(0.0, 900.0);
        shape = FaceShape::from_points(&pts).unwrap();
        assert!((lip_distance(&shape) - 4.0).abs() < 1e-9);
    }
}
