//! 프레임 차트 스타일 분류기.
//!
//! 한 프레임을 코스 단위 차트 스타일로 분류합니다. 호스트 앱은
//! `ChartStyleClassifier`를 구현해 자체 분류기(ML 등)를 공급할 수 있으며,
//! 이 모듈은 휘도 컬럼 프로파일 기반의 저비용 기본 구현을 제공합니다.

use async_trait::async_trait;
use scanner_core::{ChartStyle, FrameBuffer, StyleObservation};

use crate::error::{DetectError, DetectResult};

/// 차트 스타일 분류기 trait.
#[async_trait]
pub trait ChartStyleClassifier: Send + Sync {
    /// 분류기 이름 반환.
    fn name(&self) -> &str;

    /// 프레임 하나를 분류하여 스타일과 호출별 confidence를 반환.
    async fn classify(&self, frame: &dyn FrameBuffer) -> DetectResult<StyleObservation>;
}

/// 휘도 컬럼 프로파일 기반 분류기.
///
/// 각 컬럼의 어두운 픽셀 비율(잉크 커버리지)의 평균/분산으로
/// 스타일을 추정합니다:
/// - 라인 차트: 컬럼당 잉크가 거의 일정하고 희박
/// - 렌코: 블록 단위라 커버리지가 높고 변동이 작음
/// - 캔들/바: 몸통과 꼬리가 번갈아 나타나 컬럼 분산이 큼
/// - 하이킨아시: 캔들보다 평활되어 분산이 중간
#[derive(Debug, Default)]
pub struct LumaProfileClassifier {
    /// 어두운 픽셀 판정 기준 휘도
    dark_threshold: u8,
}

impl LumaProfileClassifier {
    /// 기본 임계값(128)으로 분류기 생성.
    pub fn new() -> Self {
        Self {
            dark_threshold: 128,
        }
    }

    /// 어두운 픽셀 판정 임계값 지정.
    pub fn with_dark_threshold(mut self, threshold: u8) -> Self {
        self.dark_threshold = threshold;
        self
    }

    /// 컬럼별 잉크 커버리지 계산.
    fn column_coverage(&self, frame: &dyn FrameBuffer) -> Vec<f32> {
        let width = frame.width();
        let height = frame.height();
        let mut coverage = Vec::with_capacity(width as usize);
        for x in 0..width {
            let mut dark = 0u32;
            for y in 0..height {
                if frame.luma_at(x, y) < self.dark_threshold {
                    dark += 1;
                }
            }
            coverage.push(dark as f32 / height as f32);
        }
        coverage
    }

    fn classify_profile(mean: f32, std_dev: f32) -> (ChartStyle, f32) {
        // 경험적 경계값. 경계에서 멀수록 confidence가 높아집니다.
        if mean < 0.04 {
            let margin = (0.04 - mean) / 0.04;
            return (ChartStyle::Line, 0.5 + 0.4 * margin.min(1.0));
        }
        if mean > 0.35 && std_dev < 0.12 {
            let margin = (mean - 0.35) / 0.35;
            return (ChartStyle::Renko, 0.5 + 0.4 * margin.min(1.0));
        }
        if std_dev > 0.18 {
            let margin = (std_dev - 0.18) / 0.18;
            return (ChartStyle::Candle, 0.5 + 0.4 * margin.min(1.0));
        }
        if std_dev > 0.10 {
            return (ChartStyle::Bar, 0.55);
        }
        if mean > 0.08 {
            return (ChartStyle::HeikinAshi, 0.5);
        }
        (ChartStyle::Unknown, 0.3)
    }
}

#[async_trait]
impl ChartStyleClassifier for LumaProfileClassifier {
    fn name(&self) -> &str {
        "luma_profile"
    }

    async fn classify(&self, frame: &dyn FrameBuffer) -> DetectResult<StyleObservation> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::InvalidInput("empty frame".to_string()));
        }

        let coverage = self.column_coverage(frame);
        let n = coverage.len() as f32;
        let mean = coverage.iter().sum::<f32>() / n;
        let variance = coverage.iter().map(|c| (c - mean).powi(2)).sum::<f32>() / n;
        let std_dev = variance.sqrt();

        let (style, confidence) = Self::classify_profile(mean, std_dev);
        tracing::trace!(
            style = %style,
            confidence,
            mean,
            std_dev,
            "Frame classified"
        );
        Ok(StyleObservation::new(style, confidence))
    }
}

/// 항상 같은 관측을 반환하는 분류기 (테스트/데모용).
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    observation: StyleObservation,
}

impl FixedClassifier {
    /// 고정 관측으로 분류기 생성.
    pub fn new(style: ChartStyle, confidence: f32) -> Self {
        Self {
            observation: StyleObservation::new(style, confidence),
        }
    }
}

#[async_trait]
impl ChartStyleClassifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn classify(&self, _frame: &dyn FrameBuffer) -> DetectResult<StyleObservation> {
        Ok(self.observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::GrayFrame;

    #[tokio::test]
    async fn test_empty_frame_is_invalid() {
        let classifier = LumaProfileClassifier::new();
        let frame = GrayFrame::from_luma(0, 0, vec![]).unwrap();
        assert!(classifier.classify(&frame).await.is_err());
    }

    #[tokio::test]
    async fn test_bright_frame_classifies_as_line() {
        // 잉크가 거의 없는 밝은 프레임은 라인 차트 쪽으로 기울어야 함
        let classifier = LumaProfileClassifier::new();
        let frame = GrayFrame::filled(64, 64, 255);
        let obs = classifier.classify(&frame).await.unwrap();
        assert_eq!(obs.style, ChartStyle::Line);
        assert!(obs.confidence >= 0.5);
    }

    #[tokio::test]
    async fn test_dark_uniform_frame_classifies_as_renko() {
        let classifier = LumaProfileClassifier::new();
        let frame = GrayFrame::filled(64, 64, 10);
        let obs = classifier.classify(&frame).await.unwrap();
        assert_eq!(obs.style, ChartStyle::Renko);
    }

    #[tokio::test]
    async fn test_alternating_columns_classify_as_candle() {
        // 짙은 몸통 컬럼과 빈 컬럼이 교대 → 높은 컬럼 분산
        let mut pixels = vec![255u8; 64 * 64];
        for y in 0..64usize {
            for x in (0..64usize).step_by(4) {
                pixels[y * 64 + x] = 0;
                pixels[y * 64 + x + 1] = 0;
            }
        }
        let frame = GrayFrame::from_luma(64, 64, pixels).unwrap();
        let classifier = LumaProfileClassifier::new();
        let obs = classifier.classify(&frame).await.unwrap();
        assert_eq!(obs.style, ChartStyle::Candle);
    }
}
