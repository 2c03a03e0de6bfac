//! 设置接口的输入校验，返回可直接展示给前端的错误消息

use crate::constants::MAX_EAR_CONSEC_FRAMES;

/// EAR 阈值：开区间 (0, 1)
pub fn validate_ear_threshold(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err("ear_threshold must be between 0 and 1 (exclusive)");
    }
    Ok(())
}

/// 唇距阈值：大于 0 且不超过分析帧边长
pub fn validate_yawn_threshold(value: f64, analysis_size: u32) -> Result<(), &'static str> {
    if !value.is_finite() || value <= 0.0 {
        return Err("yawn_threshold must be a positive number");
    }
    if value > f64::from(analysis_size) {
        return Err("yawn_threshold cannot exceed the analysis frame size");
    }
    Ok(())
}

pub fn validate_consec_frames(value: u32) -> Result<(), &'static str> {
    if value == 0 || value > MAX_EAR_CONSEC_FRAMES {
        return Err("ear_consec_frames must be between 1 and 600");
    }
    Ok(())
}
