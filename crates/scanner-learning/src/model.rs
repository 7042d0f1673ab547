//! 학습 계층 도메인 모델.
//!
//! 버킷 통계 갱신과 임계값/억제 레벨 재계산은 전부 순수 함수로
//! 모델에 두고, 엔진은 저장소 왕복과 락만 담당한다.

use chrono::{DateTime, Utc};
use scanner_core::update_win_rate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 신뢰도 버킷 개수
pub const BUCKET_COUNT: usize = 5;

/// 버킷별 대표 신뢰도 (중앙값)
///
/// [0, 0.3), [0.3, 0.5), [0.5, 0.7), [0.7, 0.9), [0.9, 1.0]
pub const BUCKET_MIDPOINTS: [f64; BUCKET_COUNT] = [0.15, 0.40, 0.60, 0.80, 0.95];

/// 버킷 임계값 재계산에 필요한 최소 결과 수
const MIN_OUTCOMES_PER_BUCKET: u32 = 3;

/// 신뢰도를 버킷 인덱스로 변환한다.
pub fn bucket_index(confidence: f64) -> usize {
    if confidence < 0.3 {
        0
    } else if confidence < 0.5 {
        1
    } else if confidence < 0.7 {
        2
    } else if confidence < 0.9 {
        3
    } else {
        4
    }
}

/// 단일 버킷 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    /// 승률 (0.0 ~ 1.0)
    pub win_rate: f64,
    /// 기록된 결과 수
    pub count: u32,
}

impl BucketStats {
    /// 결과 하나를 증분 반영한다.
    pub fn record(&mut self, won: bool) {
        let (rate, count) = update_win_rate(self.win_rate, self.count, won);
        self.win_rate = rate;
        self.count = count;
    }
}

/// 패턴별 적응형 신뢰도 프로파일.
///
/// 거래 결과를 신뢰도 버킷으로 누적하고, 버킷 승률에서
/// 개인화 임계값을 재계산한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceProfile {
    pub pattern_type: String,
    pub buckets: [BucketStats; BUCKET_COUNT],
    /// 재계산된 개인화 임계값
    pub recommended_threshold: f64,
    /// 전체 결과 수
    pub total_outcomes: u32,
    pub last_updated: DateTime<Utc>,
}

impl ConfidenceProfile {
    pub fn new(pattern_type: impl Into<String>) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            buckets: [BucketStats::default(); BUCKET_COUNT],
            recommended_threshold: 0.5,
            total_outcomes: 0,
            last_updated: Utc::now(),
        }
    }

    /// 결과 하나를 해당 버킷에 반영하고 임계값을 재계산한다.
    pub fn record_outcome(&mut self, confidence: f64, won: bool) {
        self.buckets[bucket_index(confidence)].record(won);
        self.total_outcomes = self.total_outcomes.saturating_add(1);
        self.recommended_threshold = self.optimal_threshold();
        self.last_updated = Utc::now();
    }

    /// 버킷 승률 기반 최적 임계값.
    ///
    /// 결과 수가 충분한 버킷 중 승률이 가장 높은 버킷을 고른다.
    /// 승률 0.6 이상이면 해당 버킷 중앙값보다 약간 낮춰 비슷한
    /// 신호를 더 통과시키고, 미만이면 중앙값보다 높여 보수적으로
    /// 잡는다. 유효 버킷이 없으면 기본값 0.5.
    pub fn optimal_threshold(&self) -> f64 {
        let best = self
            .buckets
            .iter()
            .enumerate()
            .filter(|(_, stats)| stats.count >= MIN_OUTCOMES_PER_BUCKET)
            .max_by(|(_, a), (_, b)| a.win_rate.total_cmp(&b.win_rate));

        match best {
            Some((index, stats)) => {
                let midpoint = BUCKET_MIDPOINTS[index];
                if stats.win_rate >= 0.6 {
                    midpoint * 0.9
                } else {
                    (midpoint + 0.1).clamp(0.4, 0.7)
                }
            }
            None => 0.5,
        }
    }
}

/// 거짓 양성 억제 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionLevel {
    None,
    Low,
    Medium,
    High,
}

impl SuppressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressionLevel::None => "NONE",
            SuppressionLevel::Low => "LOW",
            SuppressionLevel::Medium => "MEDIUM",
            SuppressionLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for SuppressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SuppressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(SuppressionLevel::None),
            "LOW" => Ok(SuppressionLevel::Low),
            "MEDIUM" => Ok(SuppressionLevel::Medium),
            "HIGH" => Ok(SuppressionLevel::High),
            _ => Err(format!("Unknown suppression level: {}", s)),
        }
    }
}

/// 패턴별 억제 규칙
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub pattern_type: String,
    pub level: SuppressionLevel,
    /// 레벨 산출 근거
    pub reason: String,
    pub win_rate: f64,
    pub total_outcomes: u32,
    /// 사용자가 레벨을 고정했는지 여부
    pub is_user_overridden: bool,
    pub last_updated: DateTime<Utc>,
}

impl SuppressionRule {
    pub fn new(pattern_type: impl Into<String>) -> Self {
        Self {
            pattern_type: pattern_type.into(),
            level: SuppressionLevel::None,
            reason: "No outcome history".to_string(),
            win_rate: 0.0,
            total_outcomes: 0,
            is_user_overridden: false,
            last_updated: Utc::now(),
        }
    }

    /// 결과 하나를 반영하고 레벨을 재계산한다.
    ///
    /// 사용자 오버라이드 규칙은 자동 갱신 대상이 아니다. 통계도
    /// 레벨도 건드리지 않는다.
    pub fn record_outcome(&mut self, was_correct: bool) {
        if self.is_user_overridden {
            return;
        }
        let (rate, count) = update_win_rate(self.win_rate, self.total_outcomes, was_correct);
        self.win_rate = rate;
        self.total_outcomes = count;
        let (level, reason) = self.computed_level();
        self.level = level;
        self.reason = reason;
        self.last_updated = Utc::now();
    }

    /// 승률/표본 수 기반 억제 레벨.
    ///
    /// 낮은 승률일수록, 표본이 많을수록 강한 억제를 건다.
    fn computed_level(&self) -> (SuppressionLevel, String) {
        if self.total_outcomes < 10 {
            return (
                SuppressionLevel::None,
                "Insufficient outcome history".to_string(),
            );
        }
        if self.win_rate < 0.20 && self.total_outcomes >= 20 {
            (
                SuppressionLevel::High,
                format!(
                    "Win rate {:.0}% over {} outcomes",
                    self.win_rate * 100.0,
                    self.total_outcomes
                ),
            )
        } else if self.win_rate < 0.30 && self.total_outcomes >= 15 {
            (
                SuppressionLevel::Medium,
                format!(
                    "Win rate {:.0}% over {} outcomes",
                    self.win_rate * 100.0,
                    self.total_outcomes
                ),
            )
        } else if self.win_rate < 0.40 && self.total_outcomes >= 10 {
            (
                SuppressionLevel::Low,
                format!(
                    "Win rate {:.0}% over {} outcomes",
                    self.win_rate * 100.0,
                    self.total_outcomes
                ),
            )
        } else {
            (
                SuppressionLevel::None,
                "Win rate acceptable".to_string(),
            )
        }
    }

    /// 억제 점수 (0.0 = 억제 없음 ~ 1.0 = 최대 억제).
    ///
    /// 승률의 역수에 가까운 값으로, 표본이 20개 미만이면 승률 쪽에
    /// sqrt 스케일 가중치를 곱해 적은 표본의 승률을 덜 신뢰한다.
    pub fn suppression_score(&self) -> f32 {
        if self.total_outcomes == 0 {
            return 0.0;
        }
        let sample_weight = (self.total_outcomes as f64 / 20.0).sqrt().min(1.0);
        (1.0 - self.win_rate * sample_weight) as f32
    }
}

/// 패턴 출현 빈도 집계
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFrequency {
    pub pattern_name: String,
    /// 패턴이 관측된 스캔 수
    pub total_scans: u64,
    /// 개별 검출 수 (스캔당 여러 개 가능)
    pub total_detections: u64,
    pub avg_confidence: f64,
    pub last_seen: DateTime<Utc>,
}

impl PatternFrequency {
    pub fn new(pattern_name: impl Into<String>) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            total_scans: 0,
            total_detections: 0,
            avg_confidence: 0.0,
            last_seen: Utc::now(),
        }
    }

    /// 스캔 하나의 관측을 누적한다.
    ///
    /// 평균 신뢰도는 직전 평균과 이번 스캔 평균의 중간값으로
    /// 갱신한다. 최근 스캔에 지수적 가중치를 주는 효과가 있다.
    pub fn record_scan(&mut self, detections_in_scan: u64, scan_avg_confidence: f64) {
        self.avg_confidence = if self.total_scans == 0 {
            scan_avg_confidence
        } else {
            (self.avg_confidence + scan_avg_confidence) / 2.0
        };
        self.total_scans += 1;
        self.total_detections += detections_in_scan;
        self.last_seen = Utc::now();
    }
}

/// 패턴 쌍 동시 출현 집계.
///
/// 쌍 키는 사전순으로 정규화한다. (a, b)와 (b, a)는 같은 행이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCooccurrence {
    pub pattern_a: String,
    pub pattern_b: String,
    pub cooccurrence_count: u64,
    /// 관측된 쌍 기회 수. 쌍이 관측된 스캔만 센다.
    pub total_opportunities: u64,
    pub cooccurrence_rate: f64,
    pub last_updated: DateTime<Utc>,
}

impl PatternCooccurrence {
    pub fn new(a: &str, b: &str) -> Self {
        let (pattern_a, pattern_b) = normalize_pair(a, b);
        Self {
            pattern_a,
            pattern_b,
            cooccurrence_count: 0,
            total_opportunities: 0,
            cooccurrence_rate: 0.0,
            last_updated: Utc::now(),
        }
    }

    /// 동시 출현 한 건을 반영한다.
    pub fn record_cooccurrence(&mut self) {
        self.cooccurrence_count += 1;
        self.total_opportunities += 1;
        self.cooccurrence_rate = self.cooccurrence_count as f64 / self.total_opportunities as f64;
        self.last_updated = Utc::now();
    }
}

/// 쌍 키를 사전순으로 정규화한다.
pub fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// 스캔 이력 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub recorded_at: DateTime<Utc>,
    pub session_id: uuid::Uuid,
    pub patterns: Vec<String>,
    pub confidences: Vec<f32>,
    pub timeframe: String,
    pub duration_ms: u64,
    /// 프레임 perceptual 해시. 중복 스캔 로깅 판별 전용.
    pub frame_hash: String,
}

/// 스캔 통계 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_scans_week: u64,
    pub total_scans_month: u64,
    pub unique_patterns: u64,
    pub most_common_pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_boundaries() {
        assert_eq!(bucket_index(0.0), 0);
        assert_eq!(bucket_index(0.29), 0);
        assert_eq!(bucket_index(0.3), 1);
        assert_eq!(bucket_index(0.5), 2);
        assert_eq!(bucket_index(0.69), 2);
        assert_eq!(bucket_index(0.7), 3);
        assert_eq!(bucket_index(0.9), 4);
        assert_eq!(bucket_index(1.0), 4);
    }

    #[test]
    fn test_profile_ten_wins_at_082_lowers_threshold() {
        let mut profile = ConfidenceProfile::new("Bull Flag");
        for _ in 0..10 {
            profile.record_outcome(0.82, true);
        }
        // 버킷 3 (중앙값 0.80), 승률 1.0 >= 0.6 → 0.80 * 0.9
        assert!((profile.recommended_threshold - 0.72).abs() < 1e-9);
        assert_eq!(profile.total_outcomes, 10);
    }

    #[test]
    fn test_profile_losing_bucket_raises_threshold() {
        let mut profile = ConfidenceProfile::new("Triangle");
        for index in 0..5 {
            profile.record_outcome(0.55, index == 0);
        }
        // 버킷 2 (중앙값 0.60), 승률 0.2 < 0.6 → clamp(0.70, 0.4, 0.7)
        assert!((profile.recommended_threshold - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_profile_under_three_outcomes_keeps_default() {
        let mut profile = ConfidenceProfile::new("Wedge");
        profile.record_outcome(0.82, true);
        profile.record_outcome(0.82, true);
        assert!((profile.recommended_threshold - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bucket_stats_incremental_win_rate() {
        let mut stats = BucketStats::default();
        stats.record(true);
        stats.record(true);
        stats.record(false);
        stats.record(false);
        assert_eq!(stats.count, 4);
        assert!((stats.win_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_suppression_levels_by_win_rate_and_sample() {
        let mut rule = SuppressionRule::new("Head and Shoulders");
        // 3승 7패 → 승률 0.30, n=10 → Low
        for index in 0..10 {
            rule.record_outcome(index < 3);
        }
        assert_eq!(rule.level, SuppressionLevel::Low);

        // 1승 더, 4패 → 4/15 ≈ 0.267 < 0.30, n=15 → Medium
        rule.record_outcome(true);
        for _ in 0..4 {
            rule.record_outcome(false);
        }
        assert_eq!(rule.level, SuppressionLevel::Medium);

        // 5패 더 → 4/20 = 0.20... < 0.20 아님, 경계 확인 후 추가 5패
        for _ in 0..5 {
            rule.record_outcome(false);
        }
        assert_eq!(rule.level, SuppressionLevel::Medium);
        for _ in 0..5 {
            rule.record_outcome(false);
        }
        // 4/25 = 0.16 < 0.20, n=25 → High
        assert_eq!(rule.level, SuppressionLevel::High);
    }

    #[test]
    fn test_suppression_under_ten_outcomes_is_none() {
        let mut rule = SuppressionRule::new("Double Top");
        for _ in 0..9 {
            rule.record_outcome(false);
        }
        assert_eq!(rule.level, SuppressionLevel::None);
        assert_eq!(rule.reason, "Insufficient outcome history");
    }

    #[test]
    fn test_user_override_freezes_rule() {
        let mut rule = SuppressionRule::new("W_Bottom");
        rule.level = SuppressionLevel::High;
        rule.is_user_overridden = true;
        for _ in 0..30 {
            rule.record_outcome(true);
        }
        // 레벨도 통계도 자동 갱신되지 않는다
        assert_eq!(rule.level, SuppressionLevel::High);
        assert_eq!(rule.total_outcomes, 0);
        assert!((rule.win_rate - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_suppression_score_discounts_win_rate_by_sample() {
        let mut rule = SuppressionRule::new("Flag");
        rule.win_rate = 0.2;
        // 1승 4패: 표본 가중치 sqrt(5/20) = 0.5 → 1 - 0.2 * 0.5
        rule.total_outcomes = 5;
        let small = rule.suppression_score();
        assert!((small - 0.9).abs() < 1e-6);
        // 표본이 차면 가중치 1 → 1 - 승률
        rule.total_outcomes = 20;
        let full = rule.suppression_score();
        assert!((full - 0.8).abs() < 1e-6);
        // 같은 승률이면 표본이 적을수록 점수가 높다
        assert!(small > full);
    }

    #[test]
    fn test_frequency_avg_confidence_halving() {
        let mut freq = PatternFrequency::new("Bull Flag");
        freq.record_scan(2, 0.8);
        assert!((freq.avg_confidence - 0.8).abs() < 1e-9);
        freq.record_scan(1, 0.4);
        assert!((freq.avg_confidence - 0.6).abs() < 1e-9);
        assert_eq!(freq.total_scans, 2);
        assert_eq!(freq.total_detections, 3);
    }

    #[test]
    fn test_pair_normalization_is_order_independent() {
        let forward = PatternCooccurrence::new("Wedge", "Flag");
        let reverse = PatternCooccurrence::new("Flag", "Wedge");
        assert_eq!(forward.pattern_a, reverse.pattern_a);
        assert_eq!(forward.pattern_b, reverse.pattern_b);
        assert_eq!(forward.pattern_a, "Flag");
    }

    #[test]
    fn test_cooccurrence_rate_stays_one_under_observed_only_counting() {
        let mut pair = PatternCooccurrence::new("Flag", "Triangle");
        pair.record_cooccurrence();
        pair.record_cooccurrence();
        assert_eq!(pair.cooccurrence_count, 2);
        assert!((pair.cooccurrence_rate - 1.0).abs() < 1e-9);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bucket_index_is_always_valid(confidence in 0.0f64..=1.0) {
                prop_assert!(bucket_index(confidence) < BUCKET_COUNT);
            }

            #[test]
            fn optimal_threshold_stays_in_unit_interval(
                outcomes in proptest::collection::vec((0.0f64..=1.0, any::<bool>()), 0..100)
            ) {
                let mut profile = ConfidenceProfile::new("Any");
                for (confidence, won) in outcomes {
                    profile.record_outcome(confidence, won);
                }
                prop_assert!((0.0..=1.0).contains(&profile.recommended_threshold));
            }

            #[test]
            fn suppression_score_stays_in_unit_interval(
                outcomes in proptest::collection::vec(any::<bool>(), 0..100)
            ) {
                let mut rule = SuppressionRule::new("Any");
                for won in outcomes {
                    rule.record_outcome(won);
                }
                let score = rule.suppression_score();
                prop_assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_suppression_level_round_trip() {
        for level in [
            SuppressionLevel::None,
            SuppressionLevel::Low,
            SuppressionLevel::Medium,
            SuppressionLevel::High,
        ] {
            assert_eq!(level.as_str().parse::<SuppressionLevel>().unwrap(), level);
        }
    }
}
