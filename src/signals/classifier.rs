//! 阈值判定
//!
//! 眼部：EAR 低于阈值时累加连续帧计数，达到阈值帧数判定为 Drowsy，
//! 之前为 Warning；任意一帧睁眼即清零并解除报警。
//! 哈欠：唇距严格大于阈值即为 Yawning，无防抖。

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EyeStatus {
    #[default]
    Normal,
    Warning,
    Drowsy,
    NoFace,
}

impl EyeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Drowsy => "Drowsy",
            Self::NoFace => "No Face",
        }
    }
}

impl Serialize for EyeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YawnStatus {
    #[default]
    Normal,
    Yawning,
    NoFace,
}

impl YawnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Yawning => "Yawning",
            Self::NoFace => "No Face",
        }
    }
}

impl Serialize for YawnStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeUpdate {
    pub status: EyeStatus,
    /// 本帧首次进入 Drowsy（报警上升沿）
    pub alarm_raised: bool,
}

#[derive(Debug, Clone)]
pub struct EyeClassifier {
    threshold: f64,
    consec_frames: u32,
    counter: u32,
    alarm: bool,
}

impl EyeClassifier {
    pub fn new(threshold: f64, consec_frames: u32) -> Self {
        Self {
            threshold,
            consec_frames: consec_frames.max(1),
            counter: 0,
            alarm: false,
        }
    }

    pub fn update(&mut self, ear: f64) -> EyeUpdate {
        if ear < self.threshold {
            self.counter = self.counter.saturating_add(1);
            if self.counter >= self.consec_frames {
                let alarm_raised = !self.alarm;
                self.alarm = true;
                EyeUpdate {
                    status: EyeStatus::Drowsy,
                    alarm_raised,
                }
            } else {
                EyeUpdate {
                    status: EyeStatus::Warning,
                    alarm_raised: false,
                }
            }
        } else {
            self.counter = 0;
            self.alarm = false;
            EyeUpdate {
                status: EyeStatus::Normal,
                alarm_raised: false,
            }
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_alarm_active(&self) -> bool {
        self.alarm
    }

    /// 运行中调整阈值，不清空计数
    pub fn set_thresholds(&mut self, threshold: f64, consec_frames: u32) {
        self.threshold = threshold;
        self.consec_frames = consec_frames.max(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YawnUpdate {
    pub status: YawnStatus,
    /// 本帧从 Normal 进入 Yawning
    pub yawn_started: bool,
}

#[derive(Debug, Clone)]
pub struct YawnClassifier {
    threshold: f64,
    yawning: bool,
}

impl YawnClassifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            yawning: false,
        }
    }

    pub fn update(&mut self, distance: f64) -> YawnUpdate {
        let yawning = distance > self.threshold;
        let yawn_started = yawning && !self.yawning;
        self.yawning = yawning;
        YawnUpdate {
            status: if yawning {
                YawnStatus::Yawning
            } else {
                YawnStatus::Normal
            },
            yawn_started,
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_until_consecutive_limit_then_drowsy() {
        let mut c = EyeClassifier::new(0.3, 3);
        assert_eq!(c.update(0.1).status, EyeStatus::Warning);
        assert_eq!(c.update(0.1).status, EyeStatus::Warning);

        let third = c.update(0.1);
        assert_eq!(third.status, EyeStatus::Drowsy);
        assert!(third.alarm_raised);

        let fourth = c.update(0.1);
        assert_eq!(fourth.status, EyeStatus::Drowsy);
        assert!(!fourth.alarm_raised);
        assert_eq!(c.counter(), 4);
    }

    #[test]
    fn single_open_frame_resets_counter_and_alarm() {
        let mut c = EyeClassifier::new(0.3, 2);
        c.update(0.1);
        c.update(0.1);
        assert!(c.is_alarm_active());

        assert_eq!(c.update(0.35).status, EyeStatus::Normal);
        assert_eq!(c.counter(), 0);
        assert!(!c.is_alarm_active());

        assert_eq!(c.update(0.1).status, EyeStatus::Warning);
    }

    #[test]
    fn threshold_is_strict() {
        let mut c = EyeClassifier::new(0.3, 1);
        assert_eq!(c.update(0.3).status, EyeStatus::Normal);
        assert_eq!(c.update(0.2999).status, EyeStatus::Drowsy);
    }

    #[test]
    fn default_thirty_frames() {
        let mut c = EyeClassifier::new(0.3, 30);
        for _ in 0..29 {
            assert_eq!(c.update(0.05).status, EyeStatus::Warning);
        }
        assert_eq!(c.update(0.05).status, EyeStatus::Drowsy);
    }

    #[test]
    fn lowering_consec_frames_takes_effect_immediately() {
        let mut c = EyeClassifier::new(0.3, 10);
        for _ in 0..5 {
            c.update(0.1);
        }
        c.set_thresholds(0.3, 4);
        assert_eq!(c.update(0.1).status, EyeStatus::Drowsy);
    }

    #[test]
    fn yawn_threshold_is_strict_and_reports_rising_edge() {
        let mut y = YawnClassifier::new(20.0);
        assert_eq!(y.update(20.0).status, YawnStatus::Normal);

        let start = y.update(20.5);
        assert_eq!(start.status, YawnStatus::Yawning);
        assert!(start.yawn_started);

        let cont = y.update(30.0);
        assert_eq!(cont.status, YawnStatus::Yawning);
        assert!(!cont.yawn_started);

        assert_eq!(y.update(5.0).status, YawnStatus::Normal);
        assert!(y.update(25.0).yawn_started);
    }

    #[test]
    fn statuses_serialize_as_display_strings() {
        assert_eq!(
            serde_json::to_string(&EyeStatus::NoFace).unwrap(),
            "\"No Face\""
        );
        assert_eq!(
            serde_json::to_string(&YawnStatus::Yawning).unwrap(),
            "\"Yawning\""
        );
    }
}
