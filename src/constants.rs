use std::ops::Range;

/// 闭眼判定的默认 EAR 阈值
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.3;

/// EAR 连续低于阈值多少帧后判定为疲劳
pub const DEFAULT_EAR_CONSEC_FRAMES: u32 = 30;

/// 哈欠判定的默认唇距阈值（分析分辨率下的像素）
pub const DEFAULT_YAWN_THRESHOLD: f64 = 20.0;

/// 分析前帧被缩放到的边长
pub const DEFAULT_ANALYSIS_SIZE: u32 = 450;

/// 68 点模型的关键点数量
pub const LANDMARK_COUNT: usize = 68;

pub const RIGHT_EYE: Range<usize> = 36..42;
pub const LEFT_EYE: Range<usize> = 42..48;
pub const OUTER_LIP: Range<usize> = 48..60;
pub const TOP_LIP_OUTER: Range<usize> = 50..53;
pub const TOP_LIP_INNER: Range<usize> = 61..64;
pub const LOW_LIP_OUTER: Range<usize> = 56..59;
pub const LOW_LIP_INNER: Range<usize> = 65..68;

/// 级联检测参数
pub const CASCADE_SCALE_FACTOR: f64 = 1.1;
pub const CASCADE_MIN_NEIGHBORS: i32 = 5;
pub const CASCADE_MIN_FACE_PX: i32 = 30;

/// 相机无帧或单帧出错后的重试间隔（毫秒）
pub const FRAME_RETRY_DELAY_MS: u64 = 100;

/// 每处理多少帧输出一次进度日志
pub const FRAME_LOG_EVERY: u64 = 30;

/// 设置接口允许的连续帧上限
pub const MAX_EAR_CONSEC_FRAMES: u32 = 600;

/// MJPEG 分段边界
pub const MJPEG_BOUNDARY: &str = "frame";

/// 叠加轮廓颜色
pub const OVERLAY_COLOR: [u8; 3] = [0, 255, 0];
