pub mod controller;
pub mod frame_buffer;
pub mod shared;
pub mod worker;

use thiserror::Error;

use crate::vision::VisionError;

pub use controller::{DetectionController, DetectionStatus};
pub use frame_buffer::{EncodedFrame, FrameBuffer};
pub use shared::{DetectionSettings, DetectionShared, Metrics};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detection already running")]
    AlreadyRunning,
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error("failed to spawn detection thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("detection task join failed: {0}")]
    Join(String),
}
