//! 스캔 파이프라인.
//!
//! 분류 → 라우팅 → 하이브리드 감지 → 억제 → 보정 → 합의 → 평가 →
//! 스캔 학습을 한 번의 호출로 잇는다. 파이프라인은 명시적으로
//! 조립되는 값이며, 전역 상태를 두지 않는다. 프레임은 호출이
//! 끝나면 보관하지 않는다.

use crate::report::{ScanReport, ScoredDetection};
use chrono::Utc;
use scanner_analytics::{ConfluenceCache, TradeabilityInput, TradeabilityScorer};
use scanner_core::{
    Detection, DetectionMethod, FrameBuffer, Outcome, ScannerConfig, ScannerResult,
};
use scanner_detect::{
    ChartStyleClassifier, ChartTypeRouter, DetectorBackend, DisabledBackend, HybridFusionEngine,
    LumaProfileClassifier,
};
use scanner_learning::{
    AdaptiveConfidenceEngine, FalsePositiveSuppressor, LearningStore, MemoryLearningStore,
    ScanLearningEngine,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 스캔 시점의 시장 상태 힌트.
///
/// 파이프라인 밖에서 계산해 넘긴다. 모르면 중립값을 쓴다.
#[derive(Debug, Clone, Copy)]
pub struct MarketContext {
    /// 정규화 변동성 레짐 (0 ~ 1)
    pub volatility_regime: f32,
    /// 유동성 프록시 (0 ~ 1)
    pub liquidity_proxy: f32,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            volatility_regime: 0.5,
            liquidity_proxy: 0.5,
        }
    }
}

/// 전체 스캔 컨텍스트.
///
/// 학습 엔진 셋은 하나의 [`LearningStore`]를 공유한다.
pub struct ScanPipeline {
    classifier: Arc<dyn ChartStyleClassifier>,
    router: Mutex<ChartTypeRouter>,
    fusion: HybridFusionEngine,
    confluence: ConfluenceCache,
    tradeability: TradeabilityScorer,
    adaptive: AdaptiveConfidenceEngine,
    suppressor: FalsePositiveSuppressor,
    scan_learning: ScanLearningEngine,
}

impl ScanPipeline {
    pub fn builder(config: ScannerConfig) -> ScanPipelineBuilder {
        ScanPipelineBuilder::new(config)
    }

    /// 프레임 하나를 스캔한다.
    ///
    /// 개별 단계 실패는 해당 단계만 degrade시킨다. 분류 실패는
    /// 직전 활성 스타일을 유지하고, 어댑터 실패는 빈 결과로
    /// 처리된다. 스캔 호출 자체는 실패하지 않는다.
    pub async fn scan(
        &self,
        frame: &dyn FrameBuffer,
        timeframe: &str,
        market: MarketContext,
    ) -> ScanReport {
        let started = Instant::now();

        // 1. 스타일 분류 + 라우팅
        let style = {
            let mut router = self.router.lock().await;
            match self.classifier.classify(frame).await {
                Ok(observation) => router.update(observation.style),
                Err(e) => {
                    warn!(error = %e, "Style classification failed, keeping active style");
                }
            }
            router.decide(Utc::now())
        };
        let tuning = ChartTypeRouter::tuning(style);

        // 2. 하이브리드 감지 + 스타일별 후처리
        let fused = self.fusion.detect(frame).await;
        let post_processed = ChartTypeRouter::post_process(fused, &tuning);

        // 3. 억제 게이트 + confidence 보정
        let mut survivors: Vec<(Detection, f32)> = Vec::new();
        let mut suppressed_count = 0usize;

        for detection in post_processed {
            if self
                .suppressor
                .should_suppress(&detection.name, detection.confidence)
                .await
            {
                suppressed_count += 1;
                continue;
            }

            let adjusted = self
                .adaptive
                .get_confidence_adjustment(&detection.name, detection.confidence)
                .await;
            survivors.push((detection, adjusted));
        }

        // 4. 타임프레임 합의 갱신
        let raw_detections: Vec<Detection> =
            survivors.iter().map(|(d, _)| d.clone()).collect();
        self.confluence.add(timeframe, raw_detections.clone()).await;
        let confluence_score = self.confluence.confluence_score().await;
        let agreeing_patterns = self.confluence.agreeing_labels().await;

        // 5. 실행 가능성 평가
        let mut scored: Vec<ScoredDetection> = survivors
            .into_iter()
            .map(|(detection, adjusted_confidence)| {
                let tradeability = self.tradeability.evaluate(&TradeabilityInput {
                    detection: detection.clone(),
                    confluence: Some(confluence_score),
                    volatility_regime: market.volatility_regime,
                    liquidity_proxy: market.liquidity_proxy,
                });
                ScoredDetection {
                    detection,
                    adjusted_confidence,
                    tradeability,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.adjusted_confidence.total_cmp(&a.adjusted_confidence));

        let duration_ms = started.elapsed().as_millis() as u64;

        // 6. 스캔 학습 (결과 라벨 없이 관측만 누적)
        self.scan_learning
            .learn_from_scan(&raw_detections, timeframe, duration_ms, Some(frame))
            .await;

        debug!(
            timeframe,
            style = %style,
            detections = scored.len(),
            suppressed = suppressed_count,
            confluence = confluence_score,
            duration_ms,
            "Scan completed"
        );

        ScanReport {
            style,
            detections: scored,
            confluence: confluence_score,
            agreeing_patterns,
            suppressed_count,
            timeframe: timeframe.to_string(),
            duration_ms,
            scanned_at: Utc::now(),
        }
    }

    /// 거래 결과 피드백.
    ///
    /// 적응형 신뢰도 엔진과 억제기 모두에 반영한다.
    pub async fn record_outcome(&self, pattern_type: &str, confidence: f64, outcome: Outcome) {
        self.adaptive
            .learn_from_outcome(pattern_type, confidence, outcome)
            .await;
        self.suppressor
            .learn_from_outcome(pattern_type, outcome.is_win())
            .await;
        info!(pattern = pattern_type, outcome = %outcome, "Outcome recorded");
    }

    /// 패턴별 개인화 임계값 조회.
    pub async fn personalized_threshold(&self, pattern_type: &str) -> f32 {
        self.adaptive.get_personalized_threshold(pattern_type).await
    }

    /// 스캔 학습 엔진 접근 (통계 조회용).
    pub fn scan_learning(&self) -> &ScanLearningEngine {
        &self.scan_learning
    }

    /// 억제기 접근 (오버라이드 설정용).
    pub fn suppressor(&self) -> &FalsePositiveSuppressor {
        &self.suppressor
    }
}

/// 파이프라인 조립 빌더.
///
/// 지정하지 않은 구성 요소는 안전한 기본값을 쓴다. 백엔드 기본값은
/// 항상 빈 결과를 돌려주는 비활성 어댑터다.
pub struct ScanPipelineBuilder {
    config: ScannerConfig,
    store: Option<Arc<dyn LearningStore>>,
    classifier: Option<Arc<dyn ChartStyleClassifier>>,
    ml_backend: Option<Arc<dyn DetectorBackend>>,
    template_backend: Option<Arc<dyn DetectorBackend>>,
}

impl ScanPipelineBuilder {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            store: None,
            classifier: None,
            ml_backend: None,
            template_backend: None,
        }
    }

    /// 설정 파일에서 빌더를 만든다. 환경 변수 오버라이드 포함.
    pub fn from_config_file<P: AsRef<std::path::Path>>(path: P) -> ScannerResult<Self> {
        Ok(Self::new(ScannerConfig::load(path)?))
    }

    pub fn with_store(mut self, store: Arc<dyn LearningStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ChartStyleClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_ml_backend(mut self, backend: Arc<dyn DetectorBackend>) -> Self {
        self.ml_backend = Some(backend);
        self
    }

    pub fn with_template_backend(mut self, backend: Arc<dyn DetectorBackend>) -> Self {
        self.template_backend = Some(backend);
        self
    }

    pub fn build(self) -> ScanPipeline {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryLearningStore::new()));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(LumaProfileClassifier::new()));
        let ml_backend = self.ml_backend.unwrap_or_else(|| {
            Arc::new(DisabledBackend::new("ml-disabled", DetectionMethod::Ml))
        });
        let template_backend = self.template_backend.unwrap_or_else(|| {
            Arc::new(DisabledBackend::new(
                "template-disabled",
                DetectionMethod::Template,
            ))
        });

        let adaptive = AdaptiveConfidenceEngine::new(Arc::clone(&store))
            .with_min_outcomes(self.config.learning.min_outcomes_for_threshold);

        ScanPipeline {
            classifier,
            router: Mutex::new(ChartTypeRouter::new(&self.config.router)),
            fusion: HybridFusionEngine::new(ml_backend, template_backend, &self.config.fusion),
            confluence: ConfluenceCache::new(&self.config.confluence),
            tradeability: TradeabilityScorer::new(self.config.tradeability.clone()),
            adaptive,
            suppressor: FalsePositiveSuppressor::new(Arc::clone(&store)),
            scan_learning: ScanLearningEngine::new(store, self.config.learning.clone()),
        }
    }
}
