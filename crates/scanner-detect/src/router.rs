//! 차트 타입 자동 라우터.
//!
//! 분류기 출력을 EMA로 평활하고 히스테리시스를 적용해 안정적인 활성
//! 스타일을 선택합니다. 스타일별 감지 튜닝 파라미터(최소 confidence,
//! wick/body 바이어스)를 공급해 감지 confidence를 후처리합니다.
//!
//! 전환 조건: 마지막 전환 이후 최소 유지 시간(250 ms)이 지났고
//! 1위 EMA가 2위를 고정 마진(0.06) 이상 앞설 때만 전환합니다.
//! Candle과 Heikin-Ashi처럼 confidence가 근접한 스타일 사이에서
//! 진동(flapping)하는 것을 막기 위한 설계입니다.

use chrono::{DateTime, Duration, Utc};
use scanner_core::{clamp01, ChartStyle, Detection, RouterConfig};
use serde::{Deserialize, Serialize};

/// 스타일별 감지 튜닝 파라미터.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleTuning {
    /// 이 스타일에서 유지할 최소 confidence
    pub min_confidence: f32,
    /// 꼬리(wick) 가중 바이어스
    pub wick_bias: f32,
    /// 몸통(body) 가중 바이어스
    pub body_bias: f32,
}

impl StyleTuning {
    const fn new(min_confidence: f32, wick_bias: f32, body_bias: f32) -> Self {
        Self {
            min_confidence,
            wick_bias,
            body_bias,
        }
    }
}

/// EMA + 히스테리시스 기반 차트 타입 라우터.
///
/// 활성 스타일은 항상 정확히 하나이며 `update`/`decide`를 통해서만 바뀝니다.
#[derive(Debug)]
pub struct ChartTypeRouter {
    alpha: f32,
    hysteresis_margin: f32,
    min_hold: Duration,
    /// `ChartStyle::CLASSIFIED` 순서의 스타일별 EMA
    ema: [f32; 5],
    active: ChartStyle,
    last_switch: Option<DateTime<Utc>>,
}

impl ChartTypeRouter {
    /// 설정으로 라우터 생성.
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            alpha: config.ema_alpha,
            hysteresis_margin: config.hysteresis_margin,
            min_hold: Duration::milliseconds(config.min_hold_ms),
            ema: [0.0; 5],
            active: ChartStyle::Unknown,
            last_switch: None,
        }
    }

    /// 기본 설정으로 라우터 생성.
    pub fn with_defaults() -> Self {
        Self::new(&RouterConfig::default())
    }

    /// 분류기 관측 하나를 EMA에 반영.
    ///
    /// `ema ← (1-α)·ema + α·hit`, hit ∈ {0, 1}. Unknown 관측은 모든
    /// 스타일에 miss로 반영됩니다.
    pub fn update(&mut self, observed: ChartStyle) {
        for (i, style) in ChartStyle::CLASSIFIED.iter().enumerate() {
            let hit = if *style == observed { 1.0 } else { 0.0 };
            self.ema[i] = (1.0 - self.alpha) * self.ema[i] + self.alpha * hit;
        }
    }

    /// 현재 시각 기준으로 활성 스타일 결정.
    ///
    /// 유지 시간과 히스테리시스 마진을 모두 만족할 때만 전환합니다.
    pub fn decide(&mut self, now: DateTime<Utc>) -> ChartStyle {
        let mut ranked: Vec<(ChartStyle, f32)> = ChartStyle::CLASSIFIED
            .iter()
            .copied()
            .zip(self.ema.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (winner, winner_score) = ranked[0];
        let runner_up_score = ranked.get(1).map(|r| r.1).unwrap_or(0.0);

        let can_switch = match self.last_switch {
            Some(at) => now - at >= self.min_hold,
            None => true,
        };
        let margin_ok = winner_score - runner_up_score >= self.hysteresis_margin;

        if self.active != winner && can_switch && margin_ok {
            tracing::debug!(
                from = %self.active,
                to = %winner,
                winner_score,
                runner_up_score,
                "Chart style switched"
            );
            self.active = winner;
            self.last_switch = Some(now);
        }
        self.active
    }

    /// 현재 활성 스타일.
    pub fn active_style(&self) -> ChartStyle {
        self.active
    }

    /// 스타일별 튜닝 파라미터. 값은 보수적인 운영 상수입니다.
    pub fn tuning(style: ChartStyle) -> StyleTuning {
        match style {
            ChartStyle::Candle => StyleTuning::new(0.58, 0.12, 0.10),
            ChartStyle::Bar => StyleTuning::new(0.60, 0.08, 0.06),
            ChartStyle::Line => StyleTuning::new(0.65, 0.00, 0.00),
            ChartStyle::HeikinAshi => StyleTuning::new(0.62, 0.06, 0.14),
            ChartStyle::Renko => StyleTuning::new(0.68, 0.00, 0.18),
            ChartStyle::Unknown => StyleTuning::new(0.70, 0.00, 0.00),
        }
    }

    /// 감지 결과에 스타일 튜닝 적용.
    ///
    /// 바이어스를 더해 confidence를 보정(클램프)한 뒤 스타일별 최소
    /// confidence 미만을 걸러냅니다.
    pub fn post_process(detections: Vec<Detection>, tuning: &StyleTuning) -> Vec<Detection> {
        if detections.is_empty() {
            return detections;
        }
        let boost = tuning.wick_bias + tuning.body_bias;
        detections
            .into_iter()
            .map(|d| {
                let adjusted = clamp01(d.confidence + boost);
                d.with_confidence(adjusted)
            })
            .filter(|d| d.confidence >= tuning.min_confidence)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scanner_core::DetectionMethod;

    fn router() -> ChartTypeRouter {
        ChartTypeRouter::with_defaults()
    }

    #[test]
    fn test_initial_style_is_unknown() {
        assert_eq!(router().active_style(), ChartStyle::Unknown);
    }

    #[test]
    fn test_converges_to_dominant_style() {
        let mut r = router();
        let now = Utc::now();
        for _ in 0..10 {
            r.update(ChartStyle::Candle);
        }
        assert_eq!(r.decide(now), ChartStyle::Candle);
    }

    #[test]
    fn test_hold_time_blocks_rapid_switches() {
        let mut r = router();
        let t0 = Utc::now();

        for _ in 0..10 {
            r.update(ChartStyle::Candle);
        }
        assert_eq!(r.decide(t0), ChartStyle::Candle);

        // 즉시 Bar가 우세해져도 250ms 안에는 전환 불가
        for _ in 0..20 {
            r.update(ChartStyle::Bar);
        }
        assert_eq!(r.decide(t0 + Duration::milliseconds(100)), ChartStyle::Candle);

        // 유지 시간이 지나면 전환
        assert_eq!(r.decide(t0 + Duration::milliseconds(300)), ChartStyle::Bar);
    }

    #[test]
    fn test_at_most_one_switch_per_hold_window() {
        let mut r = router();
        let t0 = Utc::now();
        let mut switches = 0;
        let mut prev = r.active_style();

        // 매 10ms마다 관측이 진동해도 전환은 250ms당 최대 1회
        for step in 0..50 {
            let style = if step % 2 == 0 {
                ChartStyle::Candle
            } else {
                ChartStyle::Line
            };
            for _ in 0..8 {
                r.update(style);
            }
            let decided = r.decide(t0 + Duration::milliseconds(step * 10));
            if decided != prev {
                switches += 1;
                prev = decided;
            }
        }
        // 500ms 구간 → 최대 3회 (초기 전환 포함)
        assert!(switches <= 3, "too many switches: {}", switches);
    }

    #[test]
    fn test_hysteresis_margin_prevents_near_tie_switch() {
        // α=0.25에서 교대 관측의 정상 상태 EMA 격차는 약 0.143.
        // 마진을 그보다 크게 잡으면 전환이 막혀야 한다.
        let config = RouterConfig {
            hysteresis_margin: 0.2,
            ..RouterConfig::default()
        };
        let mut r = ChartTypeRouter::new(&config);
        let t0 = Utc::now();

        // Candle을 활성화
        for _ in 0..10 {
            r.update(ChartStyle::Candle);
        }
        r.decide(t0);

        // HeikinAshi로 끝나는 교대 관측 → 1위지만 마진 미달
        for _ in 0..40 {
            r.update(ChartStyle::Candle);
            r.update(ChartStyle::HeikinAshi);
        }
        assert_eq!(
            r.decide(t0 + Duration::seconds(10)),
            ChartStyle::Candle,
            "near-tied EMAs must not flip the active style"
        );
    }

    #[test]
    fn test_post_process_filters_below_minimum() {
        let tuning = ChartTypeRouter::tuning(ChartStyle::Candle);
        let dets = vec![
            Detection::new("Flag", 0.50, DetectionMethod::Template),
            Detection::new("Triangle", 0.20, DetectionMethod::Template),
        ];
        let out = ChartTypeRouter::post_process(dets, &tuning);
        // 0.50 + 0.22 = 0.72 ≥ 0.58 유지, 0.20 + 0.22 = 0.42 < 0.58 제거
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Flag");
        assert!((out[0].confidence - 0.72).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_post_process_confidence_in_range(conf in 0.0f32..=1.0, style_idx in 0usize..6) {
            let style = match style_idx {
                0 => ChartStyle::Candle,
                1 => ChartStyle::Bar,
                2 => ChartStyle::Line,
                3 => ChartStyle::HeikinAshi,
                4 => ChartStyle::Renko,
                _ => ChartStyle::Unknown,
            };
            let tuning = ChartTypeRouter::tuning(style);
            let dets = vec![Detection::new("P", conf, DetectionMethod::Ml)];
            for d in ChartTypeRouter::post_process(dets, &tuning) {
                prop_assert!((0.0..=1.0).contains(&d.confidence));
            }
        }

        #[test]
        fn prop_ema_stays_in_unit_interval(hits in proptest::collection::vec(0usize..5, 0..200)) {
            let mut r = router();
            for hit in hits {
                r.update(ChartStyle::CLASSIFIED[hit]);
                for ema in r.ema {
                    prop_assert!((0.0..=1.0).contains(&ema));
                }
            }
        }
    }
}
