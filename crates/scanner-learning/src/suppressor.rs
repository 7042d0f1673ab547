//! 거짓 양성 억제기.
//!
//! 결과가 나쁜 패턴에 억제 레벨을 걸고, 레벨에 따라 낮은 신뢰도
//! 검출을 걸러낸다. 규칙이 없거나 저장소가 실패하면 억제하지
//! 않는다. 스캔 자체를 막는 일은 없어야 한다.

use crate::model::{SuppressionLevel, SuppressionRule};
use crate::store::LearningStore;
use crate::sync::KeyedLocks;
use std::sync::Arc;
use tracing::{debug, warn};

/// Medium 레벨에서 걸러지는 신뢰도 상한
const MEDIUM_CONFIDENCE_FLOOR: f32 = 0.70;

/// High 레벨에서 걸러지는 신뢰도 상한
const HIGH_CONFIDENCE_FLOOR: f32 = 0.80;

/// 패턴별 억제 규칙 엔진
pub struct FalsePositiveSuppressor {
    store: Arc<dyn LearningStore>,
    locks: KeyedLocks,
}

impl FalsePositiveSuppressor {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// 검출을 억제할지 판단한다.
    ///
    /// None/Low 레벨은 통과, Medium은 0.70 미만, High는 0.80 미만을
    /// 걸러낸다. 사용자 오버라이드 규칙과 규칙 부재는 통과.
    pub async fn should_suppress(&self, pattern_type: &str, confidence: f32) -> bool {
        let rule = match self.store.get_suppression_rule(pattern_type).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return false,
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Rule load failed, not suppressing");
                return false;
            }
        };

        if rule.is_user_overridden {
            return false;
        }

        let suppressed = match rule.level {
            SuppressionLevel::None | SuppressionLevel::Low => false,
            SuppressionLevel::Medium => confidence < MEDIUM_CONFIDENCE_FLOOR,
            SuppressionLevel::High => confidence < HIGH_CONFIDENCE_FLOOR,
        };

        if suppressed {
            debug!(
                pattern = pattern_type,
                confidence,
                level = %rule.level,
                reason = %rule.reason,
                "Detection suppressed"
            );
        }
        suppressed
    }

    /// 거래 결과 하나를 규칙 통계에 반영한다.
    ///
    /// 사용자가 고정한 규칙은 건드리지 않고 그대로 반환한다.
    pub async fn learn_from_outcome(&self, pattern_type: &str, was_correct: bool) {
        let lock = self.locks.lock_for(pattern_type).await;
        let _guard = lock.lock().await;

        let mut rule = match self.store.get_suppression_rule(pattern_type).await {
            Ok(Some(rule)) => rule,
            Ok(None) => SuppressionRule::new(pattern_type),
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Rule load failed, skipping outcome");
                return;
            }
        };

        if rule.is_user_overridden {
            return;
        }

        rule.record_outcome(was_correct);

        if let Err(e) = self.store.upsert_suppression_rule(&rule).await {
            warn!(pattern = pattern_type, error = %e, "Rule save failed");
            return;
        }

        debug!(
            pattern = pattern_type,
            level = %rule.level,
            win_rate = rule.win_rate,
            total = rule.total_outcomes,
            "Suppression rule updated"
        );
    }

    /// 억제 점수 (0.0 ~ 1.0). 규칙이 없으면 0.0.
    pub async fn get_suppression_score(&self, pattern_type: &str) -> f32 {
        match self.store.get_suppression_rule(pattern_type).await {
            Ok(Some(rule)) => rule.suppression_score(),
            Ok(None) => 0.0,
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Rule load failed, score 0");
                0.0
            }
        }
    }

    /// 사용자 지정 레벨로 규칙을 고정한다.
    pub async fn set_user_override(&self, pattern_type: &str, level: SuppressionLevel) {
        let lock = self.locks.lock_for(pattern_type).await;
        let _guard = lock.lock().await;

        let mut rule = match self.store.get_suppression_rule(pattern_type).await {
            Ok(Some(rule)) => rule,
            Ok(None) => SuppressionRule::new(pattern_type),
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Rule load failed, skipping override");
                return;
            }
        };

        rule.level = level;
        rule.reason = "User override".to_string();
        rule.is_user_overridden = true;
        rule.last_updated = chrono::Utc::now();

        if let Err(e) = self.store.upsert_suppression_rule(&rule).await {
            warn!(pattern = pattern_type, error = %e, "Override save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLearningStore;

    fn suppressor() -> FalsePositiveSuppressor {
        FalsePositiveSuppressor::new(Arc::new(MemoryLearningStore::new()))
    }

    async fn feed(suppressor: &FalsePositiveSuppressor, pattern: &str, wins: u32, losses: u32) {
        for _ in 0..wins {
            suppressor.learn_from_outcome(pattern, true).await;
        }
        for _ in 0..losses {
            suppressor.learn_from_outcome(pattern, false).await;
        }
    }

    #[tokio::test]
    async fn test_unknown_pattern_never_suppressed() {
        let suppressor = suppressor();
        assert!(!suppressor.should_suppress("Nonexistent", 0.1).await);
    }

    #[tokio::test]
    async fn test_low_level_does_not_suppress() {
        let suppressor = suppressor();
        // 승률 0.30, n=10 → Low
        feed(&suppressor, "Flag", 3, 7).await;
        assert!(!suppressor.should_suppress("Flag", 0.05).await);
    }

    #[tokio::test]
    async fn test_medium_level_filters_below_070() {
        let suppressor = suppressor();
        // 승률 4/15 ≈ 0.267, n=15 → Medium
        feed(&suppressor, "Triangle", 4, 11).await;
        assert!(suppressor.should_suppress("Triangle", 0.69).await);
        assert!(!suppressor.should_suppress("Triangle", 0.70).await);
    }

    #[tokio::test]
    async fn test_high_level_filters_below_080() {
        let suppressor = suppressor();
        // 승률 3/25 = 0.12, n=25 → High
        feed(&suppressor, "Double Top", 3, 22).await;
        assert!(suppressor.should_suppress("Double Top", 0.79).await);
        assert!(!suppressor.should_suppress("Double Top", 0.80).await);
    }

    #[tokio::test]
    async fn test_suppression_escalates_as_win_rate_falls() {
        let suppressor = suppressor();

        async fn level_of(s: &FalsePositiveSuppressor) -> SuppressionLevel {
            s.store
                .get_suppression_rule("Wedge")
                .await
                .unwrap()
                .unwrap()
                .level
        }

        // 5승 5패 → 승률 0.5, None
        feed(&suppressor, "Wedge", 5, 5).await;
        assert_eq!(level_of(&suppressor).await, SuppressionLevel::None);

        // 4패 추가 → 5/14 ≈ 0.357, n=14 → Low
        feed(&suppressor, "Wedge", 0, 4).await;
        assert_eq!(level_of(&suppressor).await, SuppressionLevel::Low);

        // 4패 추가 → 5/18 ≈ 0.278, n=18 → Medium
        feed(&suppressor, "Wedge", 0, 4).await;
        assert_eq!(level_of(&suppressor).await, SuppressionLevel::Medium);

        // 8패 추가 → 5/26 ≈ 0.192, n=26 → High
        feed(&suppressor, "Wedge", 0, 8).await;
        assert_eq!(level_of(&suppressor).await, SuppressionLevel::High);
    }

    #[tokio::test]
    async fn test_user_override_none_disables_suppression() {
        let suppressor = suppressor();
        feed(&suppressor, "Head and Shoulders", 3, 22).await;
        assert!(suppressor.should_suppress("Head and Shoulders", 0.5).await);

        suppressor
            .set_user_override("Head and Shoulders", SuppressionLevel::None)
            .await;
        assert!(!suppressor.should_suppress("Head and Shoulders", 0.5).await);
    }

    #[tokio::test]
    async fn test_overridden_rule_never_suppresses() {
        let suppressor = suppressor();
        suppressor
            .set_user_override("W_Bottom", SuppressionLevel::High)
            .await;
        // 오버라이드 규칙은 레벨과 무관하게 억제하지 않는다
        assert!(!suppressor.should_suppress("W_Bottom", 0.5).await);
    }

    #[tokio::test]
    async fn test_outcomes_do_not_touch_overridden_rule() {
        let suppressor = suppressor();
        suppressor
            .set_user_override("W_Bottom", SuppressionLevel::High)
            .await;
        feed(&suppressor, "W_Bottom", 30, 0).await;

        let rule = suppressor
            .store
            .get_suppression_rule("W_Bottom")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rule.level, SuppressionLevel::High);
        assert_eq!(rule.total_outcomes, 0);
        assert!(rule.is_user_overridden);
    }

    #[tokio::test]
    async fn test_suppression_score_zero_without_rule() {
        let suppressor = suppressor();
        assert_eq!(suppressor.get_suppression_score("Nonexistent").await, 0.0);
    }

    #[tokio::test]
    async fn test_suppression_score_for_bad_pattern() {
        let suppressor = suppressor();
        // 승률 0.2, n=20 → 점수 0.8
        feed(&suppressor, "Pennant", 4, 16).await;
        let score = suppressor.get_suppression_score("Pennant").await;
        assert!((score - 0.8).abs() < 1e-6);
    }
}
