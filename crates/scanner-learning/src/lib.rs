//! # scanner-learning
//!
//! 결과 주도 학습 계층.
//!
//! 세 엔진이 하나의 저장소([`LearningStore`])를 공유한다:
//!
//! ```text
//! 거래 결과 ──▶ AdaptiveConfidenceEngine ──▶ 개인화 임계값/보정
//!          └──▶ FalsePositiveSuppressor  ──▶ 패턴별 억제 레벨
//! 스캔 결과 ──▶ ScanLearningEngine       ──▶ 빈도/동시 출현/이력
//! ```
//!
//! 모든 엔진은 저장소 장애 시 기본 동작으로 degrade한다.
//! 학습 계층이 스캔 파이프라인을 멈추는 일은 없다.

pub mod adaptive;
pub mod error;
pub mod model;
pub mod scan_learning;
pub mod store;
pub mod suppressor;
pub mod sync;

pub use adaptive::AdaptiveConfidenceEngine;
pub use error::{LearningError, LearningResult};
pub use model::{
    bucket_index, normalize_pair, BucketStats, ConfidenceProfile, PatternCooccurrence,
    PatternFrequency, ScanRecord, ScanStatistics, SuppressionLevel, SuppressionRule,
    BUCKET_COUNT, BUCKET_MIDPOINTS,
};
pub use scan_learning::{perceptual_hash, ScanLearningEngine};
pub use store::{LearningStore, MemoryLearningStore, PostgresLearningStore};
pub use suppressor::FalsePositiveSuppressor;
pub use sync::KeyedLocks;
