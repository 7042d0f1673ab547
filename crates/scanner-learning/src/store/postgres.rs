//! PostgreSQL 학습 저장소.
//!
//! 스키마 행과 도메인 모델 사이 변환은 레코드 타입에서 명시적으로
//! 수행한다. 쿼리 실패는 전부 LearningError::Storage로 수렴한다.

use crate::error::{LearningError, LearningResult};
use crate::model::{
    BucketStats, ConfidenceProfile, PatternCooccurrence, PatternFrequency, ScanRecord,
    SuppressionRule, BUCKET_COUNT,
};
use crate::store::LearningStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};

/// 신뢰도 프로파일 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
struct ConfidenceProfileRecord {
    pattern_type: String,
    bucket_win_rates: Vec<f64>,
    bucket_counts: Vec<i64>,
    recommended_threshold: f64,
    total_outcomes: i64,
    last_updated: DateTime<Utc>,
}

impl ConfidenceProfileRecord {
    fn to_profile(&self) -> ConfidenceProfile {
        let mut buckets = [BucketStats::default(); BUCKET_COUNT];
        for (index, stats) in buckets.iter_mut().enumerate() {
            stats.win_rate = self.bucket_win_rates.get(index).copied().unwrap_or(0.0);
            stats.count = self
                .bucket_counts
                .get(index)
                .copied()
                .unwrap_or(0)
                .max(0) as u32;
        }
        ConfidenceProfile {
            pattern_type: self.pattern_type.clone(),
            buckets,
            recommended_threshold: self.recommended_threshold,
            total_outcomes: self.total_outcomes.max(0) as u32,
            last_updated: self.last_updated,
        }
    }
}

/// 억제 규칙 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
struct SuppressionRuleRecord {
    pattern_type: String,
    level: String,
    reason: String,
    win_rate: f64,
    total_outcomes: i64,
    is_user_overridden: bool,
    last_updated: DateTime<Utc>,
}

impl SuppressionRuleRecord {
    fn to_rule(&self) -> LearningResult<SuppressionRule> {
        let level = self
            .level
            .parse()
            .map_err(LearningError::Serialization)?;
        Ok(SuppressionRule {
            pattern_type: self.pattern_type.clone(),
            level,
            reason: self.reason.clone(),
            win_rate: self.win_rate,
            total_outcomes: self.total_outcomes.max(0) as u32,
            is_user_overridden: self.is_user_overridden,
            last_updated: self.last_updated,
        })
    }
}

/// 패턴 빈도 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
struct PatternFrequencyRecord {
    pattern_name: String,
    total_scans: i64,
    total_detections: i64,
    avg_confidence: f64,
    last_seen: DateTime<Utc>,
}

impl PatternFrequencyRecord {
    fn to_frequency(&self) -> PatternFrequency {
        PatternFrequency {
            pattern_name: self.pattern_name.clone(),
            total_scans: self.total_scans.max(0) as u64,
            total_detections: self.total_detections.max(0) as u64,
            avg_confidence: self.avg_confidence,
            last_seen: self.last_seen,
        }
    }
}

/// 동시 출현 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
struct CooccurrenceRecord {
    pattern_a: String,
    pattern_b: String,
    cooccurrence_count: i64,
    total_opportunities: i64,
    cooccurrence_rate: f64,
    last_updated: DateTime<Utc>,
}

impl CooccurrenceRecord {
    fn to_pair(&self) -> PatternCooccurrence {
        PatternCooccurrence {
            pattern_a: self.pattern_a.clone(),
            pattern_b: self.pattern_b.clone(),
            cooccurrence_count: self.cooccurrence_count.max(0) as u64,
            total_opportunities: self.total_opportunities.max(0) as u64,
            cooccurrence_rate: self.cooccurrence_rate,
            last_updated: self.last_updated,
        }
    }
}

/// PostgreSQL 기반 학습 저장소
pub struct PostgresLearningStore {
    pool: PgPool,
}

impl PostgresLearningStore {
    /// 연결 풀을 생성한다.
    pub async fn connect(url: &str, max_connections: u32) -> LearningResult<Self> {
        info!("Connecting to learning database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| LearningError::Storage(e.to_string()))?;

        info!("Learning database connection established");
        Ok(Self { pool })
    }

    /// 기존 풀을 재사용한다.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 스키마 마이그레이션을 실행한다.
    pub async fn migrate(&self) -> LearningResult<()> {
        info!("Running learning store migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LearningError::Storage(e.to_string()))?;

        info!("Migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> LearningResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| LearningError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl LearningStore for PostgresLearningStore {
    #[instrument(skip(self))]
    async fn get_confidence_profile(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<ConfidenceProfile>> {
        let record: Option<ConfidenceProfileRecord> = sqlx::query_as(
            r#"
            SELECT pattern_type, bucket_win_rates, bucket_counts,
                   recommended_threshold, total_outcomes, last_updated
            FROM confidence_profiles
            WHERE pattern_type = $1
            "#,
        )
        .bind(pattern_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_profile()))
    }

    #[instrument(skip(self, profile), fields(pattern = %profile.pattern_type))]
    async fn upsert_confidence_profile(&self, profile: &ConfidenceProfile) -> LearningResult<()> {
        let win_rates: Vec<f64> = profile.buckets.iter().map(|b| b.win_rate).collect();
        let counts: Vec<i64> = profile.buckets.iter().map(|b| b.count as i64).collect();

        sqlx::query(
            r#"
            INSERT INTO confidence_profiles
                (pattern_type, bucket_win_rates, bucket_counts,
                 recommended_threshold, total_outcomes, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (pattern_type) DO UPDATE SET
                bucket_win_rates = EXCLUDED.bucket_win_rates,
                bucket_counts = EXCLUDED.bucket_counts,
                recommended_threshold = EXCLUDED.recommended_threshold,
                total_outcomes = EXCLUDED.total_outcomes,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&profile.pattern_type)
        .bind(&win_rates)
        .bind(&counts)
        .bind(profile.recommended_threshold)
        .bind(profile.total_outcomes as i64)
        .bind(profile.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_suppression_rule(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<SuppressionRule>> {
        let record: Option<SuppressionRuleRecord> = sqlx::query_as(
            r#"
            SELECT pattern_type, level, reason, win_rate,
                   total_outcomes, is_user_overridden, last_updated
            FROM suppression_rules
            WHERE pattern_type = $1
            "#,
        )
        .bind(pattern_type)
        .fetch_optional(&self.pool)
        .await?;

        record.map(|r| r.to_rule()).transpose()
    }

    #[instrument(skip(self, rule), fields(pattern = %rule.pattern_type))]
    async fn upsert_suppression_rule(&self, rule: &SuppressionRule) -> LearningResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suppression_rules
                (pattern_type, level, reason, win_rate,
                 total_outcomes, is_user_overridden, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (pattern_type) DO UPDATE SET
                level = EXCLUDED.level,
                reason = EXCLUDED.reason,
                win_rate = EXCLUDED.win_rate,
                total_outcomes = EXCLUDED.total_outcomes,
                is_user_overridden = EXCLUDED.is_user_overridden,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&rule.pattern_type)
        .bind(rule.level.as_str())
        .bind(&rule.reason)
        .bind(rule.win_rate)
        .bind(rule.total_outcomes as i64)
        .bind(rule.is_user_overridden)
        .bind(rule.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_pattern_frequency(
        &self,
        pattern_name: &str,
    ) -> LearningResult<Option<PatternFrequency>> {
        let record: Option<PatternFrequencyRecord> = sqlx::query_as(
            r#"
            SELECT pattern_name, total_scans, total_detections, avg_confidence, last_seen
            FROM pattern_frequencies
            WHERE pattern_name = $1
            "#,
        )
        .bind(pattern_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_frequency()))
    }

    #[instrument(skip(self, frequency), fields(pattern = %frequency.pattern_name))]
    async fn upsert_pattern_frequency(&self, frequency: &PatternFrequency) -> LearningResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pattern_frequencies
                (pattern_name, total_scans, total_detections, avg_confidence, last_seen)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (pattern_name) DO UPDATE SET
                total_scans = EXCLUDED.total_scans,
                total_detections = EXCLUDED.total_detections,
                avg_confidence = EXCLUDED.avg_confidence,
                last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(&frequency.pattern_name)
        .bind(frequency.total_scans as i64)
        .bind(frequency.total_detections as i64)
        .bind(frequency.avg_confidence)
        .bind(frequency.last_seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn all_pattern_frequencies(&self) -> LearningResult<Vec<PatternFrequency>> {
        let records: Vec<PatternFrequencyRecord> = sqlx::query_as(
            r#"
            SELECT pattern_name, total_scans, total_detections, avg_confidence, last_seen
            FROM pattern_frequencies
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.iter().map(|r| r.to_frequency()).collect())
    }

    #[instrument(skip(self))]
    async fn get_cooccurrence(
        &self,
        pattern_a: &str,
        pattern_b: &str,
    ) -> LearningResult<Option<PatternCooccurrence>> {
        let (a, b) = crate::model::normalize_pair(pattern_a, pattern_b);
        let record: Option<CooccurrenceRecord> = sqlx::query_as(
            r#"
            SELECT pattern_a, pattern_b, cooccurrence_count,
                   total_opportunities, cooccurrence_rate, last_updated
            FROM pattern_cooccurrences
            WHERE pattern_a = $1 AND pattern_b = $2
            "#,
        )
        .bind(&a)
        .bind(&b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_pair()))
    }

    #[instrument(skip(self, pair), fields(a = %pair.pattern_a, b = %pair.pattern_b))]
    async fn upsert_cooccurrence(&self, pair: &PatternCooccurrence) -> LearningResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pattern_cooccurrences
                (pattern_a, pattern_b, cooccurrence_count,
                 total_opportunities, cooccurrence_rate, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (pattern_a, pattern_b) DO UPDATE SET
                cooccurrence_count = EXCLUDED.cooccurrence_count,
                total_opportunities = EXCLUDED.total_opportunities,
                cooccurrence_rate = EXCLUDED.cooccurrence_rate,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&pair.pattern_a)
        .bind(&pair.pattern_b)
        .bind(pair.cooccurrence_count as i64)
        .bind(pair.total_opportunities as i64)
        .bind(pair.cooccurrence_rate)
        .bind(pair.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn cooccurrences_for(
        &self,
        pattern: Option<&str>,
    ) -> LearningResult<Vec<PatternCooccurrence>> {
        let records: Vec<CooccurrenceRecord> = match pattern {
            Some(name) => {
                sqlx::query_as(
                    r#"
                    SELECT pattern_a, pattern_b, cooccurrence_count,
                           total_opportunities, cooccurrence_rate, last_updated
                    FROM pattern_cooccurrences
                    WHERE pattern_a = $1 OR pattern_b = $1
                    "#,
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT pattern_a, pattern_b, cooccurrence_count,
                           total_opportunities, cooccurrence_rate, last_updated
                    FROM pattern_cooccurrences
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records.iter().map(|r| r.to_pair()).collect())
    }

    #[instrument(skip(self, record), fields(timeframe = %record.timeframe))]
    async fn append_scan_history(&self, record: &ScanRecord) -> LearningResult<()> {
        let patterns = serde_json::to_value(&record.patterns)?;
        let confidences = serde_json::to_value(&record.confidences)?;

        sqlx::query(
            r#"
            INSERT INTO scan_history
                (recorded_at, session_id, patterns, confidences,
                 timeframe, duration_ms, frame_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.recorded_at)
        .bind(record.session_id)
        .bind(patterns)
        .bind(confidences)
        .bind(&record.timeframe)
        .bind(record.duration_ms as i64)
        .bind(&record.frame_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_scans_since(&self, since: DateTime<Utc>) -> LearningResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM scan_history WHERE recorded_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn last_frame_hash(&self) -> LearningResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT frame_hash FROM scan_history ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(hash,)| hash))
    }

    #[instrument(skip(self))]
    async fn purge_scan_history_before(&self, cutoff: DateTime<Utc>) -> LearningResult<u64> {
        let result = sqlx::query("DELETE FROM scan_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
