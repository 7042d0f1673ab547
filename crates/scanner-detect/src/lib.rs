//! # Scanner Detect
//!
//! 차트 스타일 분류, 라우팅, 하이브리드 패턴 감지를 제공합니다.
//!
//! # 아키텍처
//!
//! ```text
//! Frame (FrameBuffer)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ StyleClassifier  │ ← 프레임당 스타일 + confidence
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ ChartTypeRouter  │ ← EMA 평활 + 히스테리시스, 스타일별 튜닝
//! └────────┬─────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   ML Adapter    │     │ Template Adapter │
//! │ (ONNX Runtime)  │     │  (외부 공급)     │
//! └────────┬────────┘     └────────┬─────────┘
//!          │    동시 실행 + join    │
//!          └───────────┬───────────┘
//!                      ▼
//!            ┌───────────────────┐
//!            │ HybridFusionEngine│ ← 이름 중복 제거, ML 우선
//!            └───────────────────┘
//! ```

pub mod backend;
pub mod classifier;
pub mod error;
pub mod fusion;
pub mod nms;
pub mod router;

#[cfg(feature = "ml")]
pub mod onnx;

// 자주 사용되는 타입 재내보내기
pub use backend::{DetectorBackend, DisabledBackend, StaticBackend};
pub use classifier::{ChartStyleClassifier, FixedClassifier, LumaProfileClassifier};
pub use error::{DetectError, DetectResult};
pub use fusion::HybridFusionEngine;
pub use nms::non_max_suppression;
pub use router::{ChartTypeRouter, StyleTuning};

#[cfg(feature = "ml")]
pub use onnx::{OnnxDetectorConfig, OnnxPatternBackend};
