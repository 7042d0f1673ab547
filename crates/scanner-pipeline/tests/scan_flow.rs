//! 파이프라인 종단 간 테스트.
//!
//! 실제 모델 없이 고정 분류기/고정 백엔드로 스캔 플로우 전체를
//! 검증한다.

use scanner_core::{ChartStyle, Detection, DetectionMethod, GrayFrame, Outcome, ScannerConfig};
use scanner_detect::{FixedClassifier, StaticBackend};
use scanner_learning::{LearningStore, MemoryLearningStore};
use scanner_pipeline::{MarketContext, ScanPipeline, ScanPipelineBuilder};
use std::sync::Arc;

fn detection(name: &str, confidence: f32) -> Detection {
    Detection::new(name, confidence, DetectionMethod::Ml)
}

fn candle_pipeline(ml: Vec<Detection>, template: Vec<Detection>) -> ScanPipeline {
    ScanPipeline::builder(ScannerConfig::default())
        .with_classifier(Arc::new(FixedClassifier::new(ChartStyle::Candle, 0.9)))
        .with_ml_backend(Arc::new(StaticBackend::new(
            "static-ml",
            DetectionMethod::Ml,
            ml,
        )))
        .with_template_backend(Arc::new(StaticBackend::new(
            "static-template",
            DetectionMethod::Template,
            template,
        )))
        .build()
}

#[tokio::test]
async fn scan_produces_fused_scored_report() {
    let pipeline = candle_pipeline(
        vec![detection("Bull Flag", 0.60)],
        vec![detection("Bull Flag", 0.90), detection("Triangle", 0.70)],
    );
    let frame = GrayFrame::filled(128, 128, 120);

    let report = pipeline.scan(&frame, "1h", MarketContext::default()).await;

    // 같은 패턴은 ML이 이긴다. Candle 후처리 보정 +0.22.
    assert_eq!(report.style, ChartStyle::Candle);
    assert_eq!(report.detections.len(), 2);
    let flag = report
        .detections
        .iter()
        .find(|d| d.detection.name == "Bull Flag")
        .unwrap();
    assert_eq!(flag.detection.method, DetectionMethod::Ml);
    assert!((flag.detection.confidence - 0.82).abs() < 1e-6);
    assert_eq!(report.suppressed_count, 0);
    assert!(report.confluence > 0.0);
}

#[tokio::test]
async fn default_pipeline_scans_to_empty_report() {
    let pipeline = ScanPipeline::builder(ScannerConfig::default()).build();
    let frame = GrayFrame::filled(64, 64, 100);

    let report = pipeline.scan(&frame, "1h", MarketContext::default()).await;

    assert!(report.is_empty());
    assert_eq!(report.suppressed_count, 0);
    assert_eq!(report.confluence, 0.0);
}

#[tokio::test]
async fn pipeline_builds_from_config_file() {
    let path = std::env::temp_dir().join(format!("scanner-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[confluence]\nttl_secs = 45\n").unwrap();

    let pipeline = ScanPipelineBuilder::from_config_file(&path).unwrap().build();
    std::fs::remove_file(&path).ok();

    let frame = GrayFrame::filled(64, 64, 100);
    let report = pipeline.scan(&frame, "1h", MarketContext::default()).await;
    assert!(report.is_empty());

    // 없는 파일은 설정 에러로 떨어진다
    assert!(ScanPipelineBuilder::from_config_file("no/such/config.toml").is_err());
}

#[tokio::test]
async fn outcome_feedback_personalizes_threshold() {
    let pipeline = candle_pipeline(vec![detection("Bull Flag", 0.60)], Vec::new());

    assert_eq!(pipeline.personalized_threshold("Bull Flag").await, 0.5);
    for _ in 0..10 {
        pipeline.record_outcome("Bull Flag", 0.82, Outcome::Win).await;
    }
    let threshold = pipeline.personalized_threshold("Bull Flag").await;
    assert!((threshold - 0.72).abs() < 1e-6);
}

#[tokio::test]
async fn bad_history_suppresses_detections_in_scan() {
    let store: Arc<dyn LearningStore> = Arc::new(MemoryLearningStore::new());
    let pipeline = ScanPipeline::builder(ScannerConfig::default())
        .with_store(Arc::clone(&store))
        .with_classifier(Arc::new(FixedClassifier::new(ChartStyle::Candle, 0.9)))
        .with_ml_backend(Arc::new(StaticBackend::new(
            "static-ml",
            DetectionMethod::Ml,
            vec![detection("Double Top", 0.55)],
        )))
        .with_template_backend(Arc::new(StaticBackend::new(
            "static-template",
            DetectionMethod::Template,
            Vec::new(),
        )))
        .build();

    // 25회 중 3승 → High 억제. 후처리 후 0.77 < 0.80 → 걸러진다.
    for index in 0..25 {
        pipeline
            .record_outcome(
                "Double Top",
                0.55,
                if index < 3 { Outcome::Win } else { Outcome::Loss },
            )
            .await;
    }

    let frame = GrayFrame::filled(128, 128, 120);
    let report = pipeline.scan(&frame, "1h", MarketContext::default()).await;

    assert!(report.is_empty());
    assert_eq!(report.suppressed_count, 1);
}

#[tokio::test]
async fn confluence_accumulates_across_timeframes() {
    let pipeline = candle_pipeline(vec![detection("Bull Flag", 0.70)], Vec::new());
    let frame = GrayFrame::filled(128, 128, 120);

    let first = pipeline.scan(&frame, "1h", MarketContext::default()).await;
    let second = pipeline.scan(&frame, "4h", MarketContext::default()).await;

    assert!(second.confluence > first.confluence);
    assert_eq!(second.agreeing_patterns, vec!["Bull Flag".to_string()]);
}

#[tokio::test]
async fn scan_learning_sees_surviving_detections() {
    let pipeline = candle_pipeline(vec![detection("Bull Flag", 0.70)], Vec::new());
    let frame = GrayFrame::filled(128, 128, 120);

    pipeline.scan(&frame, "1h", MarketContext::default()).await;
    let stats = pipeline.scan_learning().scan_stats().await;

    assert_eq!(stats.total_scans_week, 1);
    assert_eq!(stats.most_common_pattern, Some("Bull Flag".to_string()));
}
