//! 스캔 결과 리포트.

use chrono::{DateTime, Utc};
use scanner_analytics::TradeabilityResult;
use scanner_core::{ChartStyle, Detection};
use serde::{Deserialize, Serialize};

/// 억제와 보정을 통과한 최종 감지 하나.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDetection {
    /// 원본 감지 (원시 confidence 포함)
    pub detection: Detection,
    /// 결과 학습으로 보정된 confidence
    pub adjusted_confidence: f32,
    /// 실행 가능성 평가
    pub tradeability: TradeabilityResult,
}

/// 스캔 한 번의 전체 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// 라우터가 결정한 활성 차트 스타일
    pub style: ChartStyle,
    /// 생존한 감지 목록 (보정 confidence 내림차순)
    pub detections: Vec<ScoredDetection>,
    /// 스캔 시점의 멀티 타임프레임 합의 점수
    pub confluence: f32,
    /// 둘 이상의 타임프레임에서 합의된 패턴명
    pub agreeing_patterns: Vec<String>,
    /// 억제기로 걸러진 감지 수
    pub suppressed_count: usize,
    /// 스캔 대상 타임프레임 키
    pub timeframe: String,
    /// 스캔 소요 시간 (ms)
    pub duration_ms: u64,
    pub scanned_at: DateTime<Utc>,
}

impl ScanReport {
    /// 감지가 하나도 없는 리포트 여부.
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// 가장 강한 감지.
    pub fn top_detection(&self) -> Option<&ScoredDetection> {
        self.detections.first()
    }
}
