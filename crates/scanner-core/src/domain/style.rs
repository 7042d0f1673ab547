//! 차트 스타일 타입.

use serde::{Deserialize, Serialize};

/// 코스 단위 차트 스타일.
///
/// 라우터가 독점적으로 소유하며 EMA/히스테리시스 업데이트를 통해서만 변경됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartStyle {
    /// 캔들스틱 차트
    Candle,
    /// 바 차트
    Bar,
    /// 라인 차트
    Line,
    /// 하이킨아시 차트
    HeikinAshi,
    /// 렌코 차트
    Renko,
    /// 분류 불가
    Unknown,
}

impl ChartStyle {
    /// 분류 가능한 다섯 가지 스타일 (Unknown 제외).
    pub const CLASSIFIED: [ChartStyle; 5] = [
        ChartStyle::Candle,
        ChartStyle::Bar,
        ChartStyle::Line,
        ChartStyle::HeikinAshi,
        ChartStyle::Renko,
    ];

    /// 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Candle => "candle",
            ChartStyle::Bar => "bar",
            ChartStyle::Line => "line",
            ChartStyle::HeikinAshi => "heikin_ashi",
            ChartStyle::Renko => "renko",
            ChartStyle::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChartStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "candle" => Ok(ChartStyle::Candle),
            "bar" => Ok(ChartStyle::Bar),
            "line" => Ok(ChartStyle::Line),
            "heikin_ashi" | "heikinashi" => Ok(ChartStyle::HeikinAshi),
            "renko" => Ok(ChartStyle::Renko),
            "unknown" => Ok(ChartStyle::Unknown),
            _ => Err(format!("Unknown chart style: {}", s)),
        }
    }
}

/// 분류기의 단일 호출 출력.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleObservation {
    /// 관측된 스타일
    pub style: ChartStyle,
    /// 분류 신뢰도 (0.0 ~ 1.0)
    pub confidence: f32,
}

impl StyleObservation {
    /// 새 관측 생성. confidence는 [0, 1]로 클램프됩니다.
    pub fn new(style: ChartStyle, confidence: f32) -> Self {
        Self {
            style,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
