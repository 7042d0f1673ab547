//! # scanner-pipeline
//!
//! 차트 패턴 스캔 파이프라인의 최상위 조립.
//!
//! ```text
//! Frame ──▶ Classifier ──▶ Router ──▶ Fusion(ML ∥ Template)
//!                                        │
//!                    Suppressor ◀────────┤
//!                    Adaptive 보정 ◀─────┤
//!                    Confluence ◀────────┤
//!                    Tradeability ◀──────┘
//!                                        │
//!                                   ScanReport
//! ```
//!
//! ```rust,ignore
//! use scanner_pipeline::{MarketContext, ScanPipeline};
//! use scanner_core::ScannerConfig;
//!
//! let pipeline = ScanPipeline::builder(ScannerConfig::default()).build();
//! let report = pipeline.scan(&frame, "1h", MarketContext::default()).await;
//! ```

pub mod pipeline;
pub mod report;

pub use pipeline::{MarketContext, ScanPipeline, ScanPipelineBuilder};
pub use report::{ScanReport, ScoredDetection};
