//! 스캐너 도메인 모델.

pub mod calculations;
pub mod detection;
pub mod frame;
pub mod outcome;
pub mod style;

pub use calculations::{clamp01, update_win_rate};
pub use detection::{BoundingBox, Detection, DetectionMethod};
pub use frame::{downscale_mean, FrameBuffer, GrayFrame};
pub use outcome::Outcome;
pub use style::{ChartStyle, StyleObservation};
