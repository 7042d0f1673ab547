//! 패턴 감지 결과 타입.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 감지를 생성한 방법.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// 머신러닝 기반 (차트 종류 무관)
    Ml,
    /// 템플릿 매칭 기반 (캔들스틱 최적화)
    Template,
}

impl DetectionMethod {
    /// 융합 시 우선순위. 낮을수록 우선합니다.
    ///
    /// ML 감지는 confidence와 무관하게 Template 감지보다 항상 우선합니다.
    pub fn precedence(&self) -> u8 {
        match self {
            DetectionMethod::Ml => 0,
            DetectionMethod::Template => 1,
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::Ml => write!(f, "ml"),
            DetectionMethod::Template => write!(f, "template"),
        }
    }
}

/// 프레임 좌표계의 바운딩 박스.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// 좌측 x 좌표
    pub x: f32,
    /// 상단 y 좌표
    pub y: f32,
    /// 너비
    pub width: f32,
    /// 높이
    pub height: f32,
}

impl BoundingBox {
    /// 새 바운딩 박스 생성.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 박스 면적.
    pub fn area(&self) -> f32 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    /// 다른 박스와의 IoU(Intersection over Union).
    ///
    /// 겹침이 없으면 0.0을 반환합니다.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;

        if union <= f32::EPSILON {
            0.0
        } else {
            inter / union
        }
    }
}

/// 단일 패턴 감지 결과.
///
/// 감지 어댑터가 생성하며 생성 이후 불변입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// 패턴 이름 (예: "Head and Shoulders Top")
    pub name: String,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f32,
    /// 감지 위치 (어댑터가 제공하지 않을 수 있음)
    pub bounding_box: Option<BoundingBox>,
    /// 감지 방법
    pub method: DetectionMethod,
    /// 감지 시각
    pub detected_at: DateTime<Utc>,
}

impl Detection {
    /// 새 감지 생성. confidence는 [0, 1]로 클램프됩니다.
    pub fn new(name: impl Into<String>, confidence: f32, method: DetectionMethod) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bounding_box: None,
            method,
            detected_at: Utc::now(),
        }
    }

    /// 바운딩 박스 추가.
    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// 감지 시각 지정 (리플레이/테스트용).
    pub fn with_detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }

    /// confidence를 새 값으로 교체한 사본 반환 (클램프 적용).
    pub fn with_confidence(&self, confidence: f32) -> Self {
        let mut copied = self.clone();
        copied.confidence = confidence.clamp(0.0, 1.0);
        copied
    }

    /// 표시용 신뢰도 등급.
    pub fn confidence_tier(&self) -> &'static str {
        match self.confidence {
            c if c >= 0.9 => "Very High",
            c if c >= 0.75 => "High",
            c if c >= 0.6 => "Medium",
            _ => "Low",
        }
    }
}
