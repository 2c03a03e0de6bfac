use drowsiness_monitor::signals::{eye_aspect_ratio, lip_distance, FaceShape, Point};
use proptest::prelude::*;

fn eye_strategy() -> impl Strategy<Value = [Point; 6]> {
    (
        1.0f64..100.0,
        0.0f64..40.0,
        0.0f64..40.0,
        -200.0f64..200.0,
        -200.0f64..200.0,
    )
        .prop_map(|(w, up, down, ox, oy)| {
            [
                Point::new(ox, oy),
                Point::new(ox + w / 3.0, oy - up),
                Point::new(ox + 2.0 * w / 3.0, oy - up),
                Point::new(ox + w, oy),
                Point::new(ox + 2.0 * w / 3.0, oy + down),
                Point::new(ox + w / 3.0, oy + down),
            ]
        })
}

proptest! {
    #[test]
    fn ear_is_non_negative_and_finite(eye in eye_strategy()) {
        let ear = eye_aspect_ratio(&eye);
        prop_assert!(ear.is_finite());
        prop_assert!(ear >= 0.0);
    }

    #[test]
    fn ear_is_scale_invariant(eye in eye_strategy(), k in 0.25f64..8.0) {
        let scaled = eye.map(|p| p.scaled(k, k));
        let a = eye_aspect_ratio(&eye);
        let b = eye_aspect_ratio(&scaled);
        prop_assert!((a - b).abs() < 1e-9 * a.max(1.0));
    }

    #[test]
    fn lip_distance_is_non_negative(coords in proptest::collection::vec((0.0f64..450.0, 0.0f64..450.0), 68)) {
        let points: Vec<Point> = coords.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        let shape = FaceShape::from_points(&points).unwrap();
        prop_assert!(lip_distance(&shape) >= 0.0);
    }
}
