//! 감지 어댑터 trait.
//!
//! ML 어댑터와 템플릿 어댑터는 하나의 interface에 대한 교체 가능한
//! capability 구현으로 취급됩니다. 어댑터는 프레임의 읽기 전용 뷰만
//! 받으며 호출이 끝난 뒤 프레임 참조를 유지하지 않습니다.

use async_trait::async_trait;
use scanner_core::{Detection, DetectionMethod, FrameBuffer};

use crate::error::DetectResult;

/// 감지 어댑터 trait.
#[async_trait]
pub trait DetectorBackend: Send + Sync {
    /// 어댑터 이름 반환.
    fn name(&self) -> &str;

    /// 이 어댑터가 생성하는 감지의 방법 태그.
    fn method(&self) -> DetectionMethod;

    /// 프레임 하나에서 원시 패턴 감지 목록 생성.
    async fn detect(&self, frame: &dyn FrameBuffer) -> DetectResult<Vec<Detection>>;
}

/// 항상 빈 결과를 반환하는 어댑터.
///
/// 모델 파일 누락 시 ML 어댑터를 영구적으로 비활성화하는 데 사용합니다.
/// 템플릿 감지에는 영향을 주지 않습니다.
#[derive(Debug, Clone)]
pub struct DisabledBackend {
    name: String,
    method: DetectionMethod,
}

impl DisabledBackend {
    /// 비활성화 어댑터 생성.
    pub fn new(name: impl Into<String>, method: DetectionMethod) -> Self {
        Self {
            name: name.into(),
            method,
        }
    }
}

#[async_trait]
impl DetectorBackend for DisabledBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> DetectionMethod {
        self.method
    }

    async fn detect(&self, _frame: &dyn FrameBuffer) -> DetectResult<Vec<Detection>> {
        Ok(Vec::new())
    }
}

/// 고정 감지 목록을 반환하는 어댑터 (테스트/데모용).
///
/// 반환되는 감지의 method는 어댑터의 method로 강제됩니다.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    name: String,
    method: DetectionMethod,
    detections: Vec<Detection>,
}

impl StaticBackend {
    /// 고정 감지 어댑터 생성.
    pub fn new(
        name: impl Into<String>,
        method: DetectionMethod,
        detections: Vec<Detection>,
    ) -> Self {
        let detections = detections
            .into_iter()
            .map(|mut d| {
                d.method = method;
                d
            })
            .collect();
        Self {
            name: name.into(),
            method,
            detections,
        }
    }
}

#[async_trait]
impl DetectorBackend for StaticBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> DetectionMethod {
        self.method
    }

    async fn detect(&self, _frame: &dyn FrameBuffer) -> DetectResult<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::GrayFrame;

    #[tokio::test]
    async fn test_disabled_backend_is_empty() {
        let backend = DisabledBackend::new("ml_disabled", DetectionMethod::Ml);
        let frame = GrayFrame::filled(8, 8, 0);
        assert!(backend.detect(&frame).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_backend_forces_method() {
        let backend = StaticBackend::new(
            "template",
            DetectionMethod::Template,
            vec![Detection::new("Flag", 0.8, DetectionMethod::Ml)],
        );
        let frame = GrayFrame::filled(8, 8, 0);
        let dets = backend.detect(&frame).await.unwrap();
        assert_eq!(dets[0].method, DetectionMethod::Template);
    }
}
