//! Tradeability 스코어러.
//!
//! 단일 감지의 confidence, 타임프레임 합의 점수, 변동성 레짐, 유동성
//! 프록시를 묶어 0~1의 실행 가능성 점수와 라벨을 계산합니다.
//! 순수 함수이며 부수 효과가 없습니다.

use scanner_core::{clamp01, Detection, TradeabilityConfig};
use serde::{Deserialize, Serialize};

/// 실행 가능성 라벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeabilityLabel {
    /// 실행 부적합 (score < 0.55)
    NotViable,
    /// 주의 필요 (score < 0.70)
    Caution,
    /// 실행 가능
    Viable,
}

impl std::fmt::Display for TradeabilityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeabilityLabel::NotViable => write!(f, "NOT_VIABLE"),
            TradeabilityLabel::Caution => write!(f, "CAUTION"),
            TradeabilityLabel::Viable => write!(f, "VIABLE"),
        }
    }
}

/// 평가 입력. 호출별로 생성되는 일시적 값입니다.
#[derive(Debug, Clone)]
pub struct TradeabilityInput {
    /// 평가 대상 감지
    pub detection: Detection,
    /// 타임프레임 합의 점수. 없으면 중립(0.5)으로 취급.
    pub confluence: Option<f32>,
    /// 정규화 변동성 레짐 (0 ~ 1)
    pub volatility_regime: f32,
    /// 유동성 프록시 (0 ~ 1)
    pub liquidity_proxy: f32,
}

/// 평가 결과.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeabilityResult {
    /// 실행 가능성 점수 (0 ~ 1)
    pub score: f32,
    /// 점수 라벨
    pub label: TradeabilityLabel,
}

/// Tradeability 스코어러.
#[derive(Debug, Clone)]
pub struct TradeabilityScorer {
    config: TradeabilityConfig,
}

impl TradeabilityScorer {
    /// 가중치 설정으로 스코어러 생성.
    pub fn new(config: TradeabilityConfig) -> Self {
        Self { config }
    }

    /// 기본 가중치(0.45/0.25/0.15/0.15)로 스코어러 생성.
    pub fn with_defaults() -> Self {
        Self::new(TradeabilityConfig::default())
    }

    /// 입력을 평가하여 점수와 라벨 반환.
    ///
    /// 모든 입력 항은 [0, 1]로 클램프된 뒤 가중 합산됩니다.
    pub fn evaluate(&self, input: &TradeabilityInput) -> TradeabilityResult {
        let conf = clamp01(input.detection.confidence);
        let confluence = clamp01(input.confluence.unwrap_or(0.5));
        let vol_adj = Self::adjust_volatility(input.volatility_regime);
        let liquidity = clamp01(input.liquidity_proxy);

        let score = self.config.confidence_weight * conf
            + self.config.confluence_weight * confluence
            + self.config.volatility_weight * vol_adj
            + self.config.liquidity_weight * liquidity;
        let score = clamp01(score);

        let label = match score {
            s if s < 0.55 => TradeabilityLabel::NotViable,
            s if s < 0.70 => TradeabilityLabel::Caution,
            _ => TradeabilityLabel::Viable,
        };

        TradeabilityResult { score, label }
    }

    /// 변동성 선호 보정.
    ///
    /// 0.5를 중심으로 한 종 모양 선호: 너무 낮거나 너무 높은 변동성
    /// 모두 감점합니다. 중심에서 1.0, 양 극단에서 0.4.
    fn adjust_volatility(v: f32) -> f32 {
        let x = clamp01(v);
        let dist = (x - 0.5).abs();
        1.0 - (dist * 2.0).min(1.0) * 0.6
    }
}
