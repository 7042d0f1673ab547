//! 하이브리드 융합 엔진.
//!
//! ML 어댑터와 템플릿 어댑터를 동시에 실행하고, 두 결과를 합친 뒤
//! 패턴 이름으로 중복을 제거합니다. 같은 이름이 양쪽에서 나오면
//! confidence와 무관하게 ML 감지가 이깁니다. 같은 방법끼리는 더 높은
//! confidence가 이깁니다. 이 우선순위(ML > Template > 같은 방법 중
//! 높은 confidence)는 문서화된 설계 결정입니다.
//!
//! 한쪽 어댑터의 실패나 타임아웃은 해당 어댑터의 빈 결과로 처리되어
//! 파이프라인을 막지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scanner_core::{Detection, FrameBuffer, FusionConfig};
use tracing::warn;

use crate::backend::DetectorBackend;
use crate::error::DetectError;

/// 하이브리드 융합 엔진.
pub struct HybridFusionEngine {
    ml: Arc<dyn DetectorBackend>,
    template: Arc<dyn DetectorBackend>,
    inference_timeout: Duration,
}

impl HybridFusionEngine {
    /// 두 어댑터로 융합 엔진 생성.
    pub fn new(
        ml: Arc<dyn DetectorBackend>,
        template: Arc<dyn DetectorBackend>,
        config: &FusionConfig,
    ) -> Self {
        Self {
            ml,
            template,
            inference_timeout: Duration::from_millis(config.inference_timeout_ms),
        }
    }

    /// 두 어댑터를 동시에 실행하고 융합된 감지 목록 반환.
    ///
    /// 두 어댑터 모두 완료된 뒤에야 병합이 시작됩니다(join barrier).
    /// 반환 목록은 confidence 내림차순으로 정렬됩니다.
    pub async fn detect(&self, frame: &dyn FrameBuffer) -> Vec<Detection> {
        let (ml_result, template_result) = tokio::join!(
            self.run_adapter(self.ml.as_ref(), frame),
            self.run_adapter(self.template.as_ref(), frame),
        );

        let mut combined = ml_result;
        combined.extend(template_result);
        Self::fuse(combined)
    }

    /// 어댑터 하나를 타임아웃 안에서 실행. 실패/타임아웃은 빈 결과.
    async fn run_adapter(
        &self,
        adapter: &dyn DetectorBackend,
        frame: &dyn FrameBuffer,
    ) -> Vec<Detection> {
        let error = match tokio::time::timeout(self.inference_timeout, adapter.detect(frame)).await
        {
            Ok(Ok(detections)) => return detections,
            Ok(Err(e)) => e,
            Err(_) => DetectError::Timeout {
                timeout_ms: self.inference_timeout.as_millis() as u64,
            },
        };
        warn!(adapter = adapter.name(), error = %error, "Adapter degraded to empty result");
        Vec::new()
    }

    /// 이름 기준 중복 제거와 정렬.
    fn fuse(detections: Vec<Detection>) -> Vec<Detection> {
        let mut by_name: HashMap<String, Detection> = HashMap::new();
        for candidate in detections {
            match by_name.get(&candidate.name) {
                None => {
                    by_name.insert(candidate.name.clone(), candidate);
                }
                Some(existing) => {
                    let candidate_rank = candidate.method.precedence();
                    let existing_rank = existing.method.precedence();
                    let wins = candidate_rank < existing_rank
                        || (candidate_rank == existing_rank
                            && candidate.confidence > existing.confidence);
                    if wins {
                        by_name.insert(candidate.name.clone(), candidate);
                    }
                }
            }
        }

        let mut fused: Vec<Detection> = by_name.into_values().collect();
        fused.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::DetectionMethod;

    fn det(name: &str, conf: f32, method: DetectionMethod) -> Detection {
        Detection::new(name, conf, method)
    }

    #[test]
    fn test_ml_wins_over_template_regardless_of_confidence() {
        let fused = HybridFusionEngine::fuse(vec![
            det("Flag", 0.6, DetectionMethod::Ml),
            det("Flag", 0.9, DetectionMethod::Template),
        ]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].method, DetectionMethod::Ml);
        assert_eq!(fused[0].confidence, 0.6);
    }

    #[test]
    fn test_same_method_higher_confidence_wins() {
        let fused = HybridFusionEngine::fuse(vec![
            det("Flag", 0.6, DetectionMethod::Template),
            det("Flag", 0.8, DetectionMethod::Template),
        ]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].confidence, 0.8);
    }

    #[test]
    fn test_output_sorted_by_confidence_descending() {
        let fused = HybridFusionEngine::fuse(vec![
            det("A", 0.3, DetectionMethod::Ml),
            det("B", 0.9, DetectionMethod::Template),
            det("C", 0.6, DetectionMethod::Ml),
        ]);
        let confs: Vec<f32> = fused.iter().map(|d| d.confidence).collect();
        assert_eq!(confs, vec![0.9, 0.6, 0.3]);
    }

    #[test]
    fn test_order_independent_precedence() {
        // Template가 먼저 들어와도 ML이 이겨야 함
        let fused = HybridFusionEngine::fuse(vec![
            det("Flag", 0.9, DetectionMethod::Template),
            det("Flag", 0.6, DetectionMethod::Ml),
        ]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].method, DetectionMethod::Ml);
    }
}
