//! 적응형 신뢰도 엔진.
//!
//! 거래 결과를 패턴별 신뢰도 버킷에 누적하고, 누적 통계에서
//! 개인화 임계값과 신뢰도 보정값을 산출한다. 저장소 장애는
//! 기본값으로 degrade하고 호출자에게 전파하지 않는다.

use crate::model::{bucket_index, ConfidenceProfile};
use crate::store::LearningStore;
use crate::sync::KeyedLocks;
use scanner_core::{clamp01, Outcome};
use std::sync::Arc;
use tracing::{debug, warn};

/// 개인화 임계값을 내놓기 위한 최소 결과 수
const MIN_OUTCOMES_FOR_THRESHOLD: u32 = 10;

/// 버킷 승률이 신뢰도 보정에 기여하는 폭
const ADJUSTMENT_ALPHA: f64 = 0.2;

/// 프로파일이 없을 때의 기본 임계값
const DEFAULT_THRESHOLD: f32 = 0.5;

/// 결과 기반 신뢰도 캘리브레이터
pub struct AdaptiveConfidenceEngine {
    store: Arc<dyn LearningStore>,
    locks: KeyedLocks,
    min_outcomes: u32,
}

impl AdaptiveConfidenceEngine {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            min_outcomes: MIN_OUTCOMES_FOR_THRESHOLD,
        }
    }

    /// 개인화 임계값 적용에 필요한 최소 결과 수를 설정한다.
    pub fn with_min_outcomes(mut self, min_outcomes: u32) -> Self {
        self.min_outcomes = min_outcomes;
        self
    }

    /// 거래 결과 하나를 프로파일에 반영한다.
    ///
    /// 같은 패턴에 대한 갱신은 락으로 직렬화한다. 저장소 장애는
    /// 경고 로그 후 무시한다.
    pub async fn learn_from_outcome(&self, pattern_type: &str, confidence: f64, outcome: Outcome) {
        let lock = self.locks.lock_for(pattern_type).await;
        let _guard = lock.lock().await;

        let mut profile = match self.store.get_confidence_profile(pattern_type).await {
            Ok(Some(profile)) => profile,
            Ok(None) => ConfidenceProfile::new(pattern_type),
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Profile load failed, skipping outcome");
                return;
            }
        };

        profile.record_outcome(confidence, outcome.is_win());

        if let Err(e) = self.store.upsert_confidence_profile(&profile).await {
            warn!(pattern = pattern_type, error = %e, "Profile save failed");
            return;
        }

        debug!(
            pattern = pattern_type,
            bucket = bucket_index(confidence),
            won = outcome.is_win(),
            threshold = profile.recommended_threshold,
            total = profile.total_outcomes,
            "Outcome recorded"
        );
    }

    /// 패턴별 개인화 임계값.
    ///
    /// 결과가 10개 미만이거나 프로파일이 없으면 기본값 0.5.
    pub async fn get_personalized_threshold(&self, pattern_type: &str) -> f32 {
        match self.store.get_confidence_profile(pattern_type).await {
            Ok(Some(profile)) if profile.total_outcomes >= self.min_outcomes => {
                profile.recommended_threshold as f32
            }
            Ok(_) => DEFAULT_THRESHOLD,
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Profile load failed, using default threshold");
                DEFAULT_THRESHOLD
            }
        }
    }

    /// 원시 신뢰도를 버킷 승률로 보정한다.
    ///
    /// 승률 0.5를 기준으로 위면 올리고 아래면 내린다. 결과가
    /// 10개 미만이거나 해당 버킷에 데이터가 없으면 원시값 그대로.
    pub async fn get_confidence_adjustment(&self, pattern_type: &str, raw_confidence: f32) -> f32 {
        let profile = match self.store.get_confidence_profile(pattern_type).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return raw_confidence,
            Err(e) => {
                warn!(pattern = pattern_type, error = %e, "Profile load failed, returning raw confidence");
                return raw_confidence;
            }
        };

        if profile.total_outcomes < self.min_outcomes {
            return raw_confidence;
        }

        let stats = profile.buckets[bucket_index(raw_confidence as f64)];
        if stats.count == 0 {
            return raw_confidence;
        }

        clamp01(raw_confidence + (ADJUSTMENT_ALPHA * (stats.win_rate - 0.5)) as f32)
    }
}
