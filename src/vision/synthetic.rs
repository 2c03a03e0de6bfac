//! 合成视觉后端
//!
//! 按脚本逐帧生成一张"人脸"画面，并给出与脚本一致的人脸框和 68 点关键点。
//! 无需摄像头和模型文件，用于本地演示和测试。
//!
//! 脚本中的 `eye_openness` 即期望的 EAR，`lip_distance` 即分析分辨率下的唇距像素。

use std::f64::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CameraConfig;
use crate::constants::LANDMARK_COUNT;
use crate::signals::{FaceShape, Point};

use super::{
    FaceDetector, FaceRect, FrameSource, LandmarkPredictor, VisionBackend, VisionError,
    VisionSession,
};

const BACKEND_NAME: &str = "synthetic";

/// 单帧脚本状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFace {
    pub eye_openness: f64,
    pub lip_distance: f64,
}

impl SyntheticFace {
    pub const ALERT: Self = Self {
        eye_openness: 0.32,
        lip_distance: 8.0,
    };
    pub const EYES_CLOSED: Self = Self {
        eye_openness: 0.12,
        lip_distance: 8.0,
    };
    pub const YAWNING: Self = Self {
        eye_openness: 0.28,
        lip_distance: 32.0,
    };
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticScript {
    frames: Vec<Option<SyntheticFace>>,
}

impl SyntheticScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face(mut self, face: SyntheticFace, frames: usize) -> Self {
        self.frames.extend(std::iter::repeat(Some(face)).take(frames));
        self
    }

    pub fn no_face(mut self, frames: usize) -> Self {
        self.frames.extend(std::iter::repeat(None).take(frames));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    script: Arc<[Option<SyntheticFace>]>,
    jitter_px: f64,
    seed: u64,
    unavailable: bool,
    pace: bool,
}

impl SyntheticBackend {
    pub fn new(script: SyntheticScript) -> Self {
        let frames = if script.is_empty() {
            vec![None]
        } else {
            script.frames
        };
        Self {
            script: frames.into(),
            jitter_px: 0.0,
            seed: 7,
            unavailable: false,
            pace: true,
        }
    }

    /// 演示循环：清醒 → 持续闭眼（触发报警）→ 清醒 → 哈欠 → 离开画面
    pub fn demo() -> Self {
        let script = SyntheticScript::new()
            .face(SyntheticFace::ALERT, 90)
            .face(SyntheticFace::EYES_CLOSED, 45)
            .face(SyntheticFace::ALERT, 60)
            .face(SyntheticFace::YAWNING, 30)
            .face(SyntheticFace::ALERT, 30)
            .no_face(20);
        Self::new(script).with_jitter(0.3)
    }

    pub fn with_jitter(mut self, jitter_px: f64) -> Self {
        self.jitter_px = jitter_px.max(0.0);
        self
    }

    /// 不按帧率节流，尽快出帧
    pub fn unpaced(mut self) -> Self {
        self.pace = false;
        self
    }

    /// 模拟摄像头无法打开
    pub fn unavailable() -> Self {
        let mut backend = Self::new(SyntheticScript::new());
        backend.unavailable = true;
        backend
    }
}

impl VisionBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn open(&self, camera: &CameraConfig) -> Result<VisionSession, VisionError> {
        if self.unavailable {
            return Err(VisionError::CameraUnavailable {
                index: camera.index,
                message: "synthetic camera configured as unavailable".to_string(),
            });
        }

        let scene: Scene = Arc::new(Mutex::new(None));
        let interval = if self.pace {
            Some(Duration::from_secs_f64(1.0 / f64::from(camera.fps.max(1))))
        } else {
            None
        };

        Ok(VisionSession {
            source: Box::new(SyntheticSource {
                width: camera.width.max(1),
                height: camera.height.max(1),
                script: self.script.clone(),
                cursor: 0,
                interval,
                next_due: None,
                scene: scene.clone(),
            }),
            detector: Box::new(SyntheticDetector {
                scene: scene.clone(),
            }),
            predictor: Box::new(SyntheticPredictor {
                scene,
                jitter_px: self.jitter_px,
                rng: StdRng::seed_from_u64(self.seed),
            }),
        })
    }
}

/// 当前帧的脚本状态，由 source 写入，detector/predictor 读取
type Scene = Arc<Mutex<Option<SyntheticFace>>>;

fn lock_scene(scene: &Scene) -> MutexGuard<'_, Option<SyntheticFace>> {
    scene.lock().unwrap_or_else(|e| e.into_inner())
}

struct SyntheticSource {
    width: u32,
    height: u32,
    script: Arc<[Option<SyntheticFace>]>,
    cursor: usize,
    interval: Option<Duration>,
    next_due: Option<Instant>,
    scene: Scene,
}

impl SyntheticSource {
    fn wait_for_next_frame(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        let now = Instant::now();
        let due = match self.next_due {
            Some(due) if due > now => {
                std::thread::sleep(due - now);
                due
            }
            _ => now,
        };
        self.next_due = Some(due + interval);
    }

    fn render(&self, face: Option<SyntheticFace>) -> RgbImage {
        let (w, h) = (self.width, self.height);
        let mut img = RgbImage::from_fn(w, h, |_, y| {
            let shade = 40 + (60 * y / h.max(1)) as u8;
            Rgb([shade, shade, shade.saturating_add(10)])
        });

        let Some(face) = face else {
            return img;
        };

        let fw = f64::from(w);
        let fh = f64::from(h);
        let at = |u: f64, v: f64| ((u * fw) as i32, (v * fh) as i32);

        draw_filled_ellipse_mut(
            &mut img,
            at(0.5, 0.5),
            (0.22 * fw) as i32,
            (0.35 * fh) as i32,
            Rgb([224, 182, 150]),
        );

        let eye_rx = (0.035 * fw) as i32;
        let eye_ry = ((face.eye_openness * 0.05 * fh) as i32).max(1);
        for u in [0.42, 0.58] {
            draw_filled_ellipse_mut(&mut img, at(u, 0.43), eye_rx, eye_ry, Rgb([30, 30, 30]));
        }

        let mouth_ry = ((face.lip_distance / 450.0 * 0.7 * fh / 2.0) as i32).max(1);
        draw_filled_ellipse_mut(
            &mut img,
            at(0.5, 0.7),
            (0.06 * fw) as i32,
            mouth_ry,
            Rgb([120, 40, 40]),
        );

        img
    }
}

impl FrameSource for SyntheticSource {
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError> {
        self.wait_for_next_frame();

        let face = self.script[self.cursor % self.script.len()];
        self.cursor = self.cursor.wrapping_add(1);
        *lock_scene(&self.scene) = face;

        Ok(Some(self.render(face)))
    }
}

struct SyntheticDetector {
    scene: Scene,
}

impl FaceDetector for SyntheticDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<FaceRect>, VisionError> {
        if lock_scene(&self.scene).is_none() {
            return Ok(Vec::new());
        }
        let (w, h) = gray.dimensions();
        Ok(vec![FaceRect::new(
            w * 28 / 100,
            h * 15 / 100,
            (w * 44 / 100).max(1),
            (h * 70 / 100).max(1),
        )])
    }
}

struct SyntheticPredictor {
    scene: Scene,
    jitter_px: f64,
    rng: StdRng,
}

impl LandmarkPredictor for SyntheticPredictor {
    fn predict(&mut self, _gray: &GrayImage, face: FaceRect) -> Result<FaceShape, VisionError> {
        let state = (*lock_scene(&self.scene))
            .ok_or_else(|| VisionError::Landmarks("no face in synthetic scene".to_string()))?;

        let mut points = template_points(face, state);
        if self.jitter_px > 0.0 {
            let j = self.jitter_px;
            for p in points.iter_mut() {
                p.x += self.rng.gen_range(-j..=j);
                p.y += self.rng.gen_range(-j..=j);
            }
        }
        Ok(FaceShape::new(points))
    }
}

/// 按 68 点模型排布关键点；眼睛 EAR 恰为 `eye_openness`，唇距恰为 `lip_distance`
fn template_points(face: FaceRect, state: SyntheticFace) -> [Point; LANDMARK_COUNT] {
    let ox = f64::from(face.x);
    let oy = f64::from(face.y);
    let fw = f64::from(face.width);
    let fh = f64::from(face.height);
    let at = |u: f64, v: f64| Point::new(ox + u * fw, oy + v * fh);

    let mut pts = [Point::default(); LANDMARK_COUNT];

    // 下颌 0-16
    for (i, p) in pts[0..17].iter_mut().enumerate() {
        let t = PI * i as f64 / 16.0;
        *p = at(0.5 - 0.45 * t.cos(), 0.35 + 0.6 * t.sin());
    }
    // 眉毛 17-26
    for i in 0..5 {
        let step = i as f64 * 0.06;
        pts[17 + i] = at(0.18 + step, 0.28);
        pts[22 + i] = at(0.58 + step, 0.28);
    }
    // 鼻梁 27-30，鼻底 31-35
    for i in 0..4 {
        pts[27 + i] = at(0.5, 0.35 + i as f64 * 0.08);
    }
    for i in 0..5 {
        pts[31 + i] = at(0.42 + i as f64 * 0.04, 0.64);
    }

    let eye_w = 0.16 * fw;
    let eye_h = state.eye_openness.max(0.0) * eye_w;
    place_eye(&mut pts[36..42], at(0.32, 0.40), eye_w, eye_h);
    place_eye(&mut pts[42..48], at(0.68, 0.40), eye_w, eye_h);

    let center = at(0.5, 0.78);
    let mouth_w = 0.3 * fw;
    let half_gap = state.lip_distance.max(0.0) / 2.0;
    let top = center.y - half_gap;
    let low = center.y + half_gap;
    let x_at = |frac: f64| center.x + frac * mouth_w;

    pts[48] = Point::new(x_at(-0.5), center.y);
    pts[54] = Point::new(x_at(0.5), center.y);
    // 上唇外缘 49-53（从左到右），下唇外缘 55-59（从右到左）
    for i in 0..5 {
        let frac = -1.0 / 3.0 + i as f64 / 6.0;
        pts[49 + i] = Point::new(x_at(frac), top);
        pts[59 - i] = Point::new(x_at(frac), low);
    }
    pts[60] = Point::new(x_at(-0.4), center.y);
    pts[64] = Point::new(x_at(0.4), center.y);
    for i in 0..3 {
        let frac = -0.2 + i as f64 * 0.2;
        pts[61 + i] = Point::new(x_at(frac), top);
        pts[67 - i] = Point::new(x_at(frac), low);
    }

    pts
}

fn place_eye(eye: &mut [Point], center: Point, width: f64, height: f64) {
    let (cx, cy) = (center.x, center.y);
    eye[0] = Point::new(cx - width / 2.0, cy);
    eye[1] = Point::new(cx - width / 6.0, cy - height / 2.0);
    eye[2] = Point::new(cx + width / 6.0, cy - height / 2.0);
    eye[3] = Point::new(cx + width / 2.0, cy);
    eye[4] = Point::new(cx + width / 6.0, cy + height / 2.0);
    eye[5] = Point::new(cx - width / 6.0, cy + height / 2.0);
}
