//! 학습 데이터 저장소 추상화.
//!
//! 엔진은 LearningStore 트레이트만 바라본다. 운영에서는
//! PostgresLearningStore, 테스트/임베디드에서는 MemoryLearningStore를
//! 꽂는다.

mod memory;
mod postgres;

pub use memory::MemoryLearningStore;
pub use postgres::PostgresLearningStore;

use crate::error::LearningResult;
use crate::model::{
    ConfidenceProfile, PatternCooccurrence, PatternFrequency, ScanRecord, SuppressionRule,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 학습 상태 영속화 인터페이스
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn get_confidence_profile(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<ConfidenceProfile>>;

    async fn upsert_confidence_profile(&self, profile: &ConfidenceProfile) -> LearningResult<()>;

    async fn get_suppression_rule(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<SuppressionRule>>;

    async fn upsert_suppression_rule(&self, rule: &SuppressionRule) -> LearningResult<()>;

    async fn get_pattern_frequency(
        &self,
        pattern_name: &str,
    ) -> LearningResult<Option<PatternFrequency>>;

    async fn upsert_pattern_frequency(&self, frequency: &PatternFrequency) -> LearningResult<()>;

    /// 전체 빈도 행. 호출자가 정렬한다.
    async fn all_pattern_frequencies(&self) -> LearningResult<Vec<PatternFrequency>>;

    /// 쌍 키는 정규화된 상태로 전달된다.
    async fn get_cooccurrence(
        &self,
        pattern_a: &str,
        pattern_b: &str,
    ) -> LearningResult<Option<PatternCooccurrence>>;

    async fn upsert_cooccurrence(&self, pair: &PatternCooccurrence) -> LearningResult<()>;

    /// pattern이 Some이면 해당 패턴이 포함된 쌍만 반환한다.
    async fn cooccurrences_for(
        &self,
        pattern: Option<&str>,
    ) -> LearningResult<Vec<PatternCooccurrence>>;

    async fn append_scan_history(&self, record: &ScanRecord) -> LearningResult<()>;

    async fn count_scans_since(&self, since: DateTime<Utc>) -> LearningResult<u64>;

    /// 가장 최근 스캔의 프레임 해시. 중복 스캔 로깅 판별용.
    async fn last_frame_hash(&self) -> LearningResult<Option<String>>;

    /// cutoff 이전 스캔 이력을 삭제하고 삭제 건수를 돌려준다.
    async fn purge_scan_history_before(&self, cutoff: DateTime<Utc>) -> LearningResult<u64>;
}
