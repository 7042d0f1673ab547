//! 설정 관리.
//!
//! 이 모듈은 스캐너 파이프라인의 튜닝 가능한 값을 정의하고 관리합니다.
//! 모든 기본값은 운영에서 검증된 보수적인 상수입니다.

use crate::error::ScannerResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 스캐너 전체 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// 차트 타입 라우터 설정
    #[serde(default)]
    pub router: RouterConfig,
    /// 하이브리드 융합 설정
    #[serde(default)]
    pub fusion: FusionConfig,
    /// 다중 타임프레임 confluence 설정
    #[serde(default)]
    pub confluence: ConfluenceConfig,
    /// tradeability 스코어러 설정
    #[serde(default)]
    pub tradeability: TradeabilityConfig,
    /// 학습 엔진 설정
    #[serde(default)]
    pub learning: LearningConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 차트 타입 라우터 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterConfig {
    /// EMA 평활 계수
    pub ema_alpha: f32,
    /// 스타일 전환에 필요한 1위-2위 EMA 마진
    pub hysteresis_margin: f32,
    /// 스타일 전환 사이 최소 유지 시간 (밀리초)
    pub min_hold_ms: i64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.25,
            hysteresis_margin: 0.06,
            min_hold_ms: 250,
        }
    }
}

/// 하이브리드 융합 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FusionConfig {
    /// 어댑터 추론 타임아웃 (밀리초). 초과 시 해당 어댑터 결과를 비움.
    pub inference_timeout_ms: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            inference_timeout_ms: 2_000,
        }
    }
}

/// 다중 타임프레임 confluence 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfluenceConfig {
    /// 캐시 엔트리 TTL (초)
    pub ttl_secs: i64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self { ttl_secs: 90 }
    }
}

/// tradeability 스코어러 가중치 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradeabilityConfig {
    /// 감지 confidence 가중치
    pub confidence_weight: f32,
    /// confluence 가중치
    pub confluence_weight: f32,
    /// 변동성 레짐 가중치
    pub volatility_weight: f32,
    /// 유동성 프록시 가중치
    pub liquidity_weight: f32,
}

impl Default for TradeabilityConfig {
    fn default() -> Self {
        Self {
            confidence_weight: 0.45,
            confluence_weight: 0.25,
            volatility_weight: 0.15,
            liquidity_weight: 0.15,
        }
    }
}

/// 학습 엔진 공통 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LearningConfig {
    /// 개인화 임계값 적용에 필요한 최소 결과 수
    pub min_outcomes_for_threshold: u32,
    /// 스캔 학습에 포함할 최소 감지 confidence
    pub min_confidence_for_learning: f32,
    /// 스캔 히스토리 보존 기간 (일)
    pub scan_history_retention_days: i64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_outcomes_for_threshold: 10,
            min_confidence_for_learning: 0.3,
            scan_history_retention_days: 90,
        }
    }
}

/// 로깅 설정 (파일 기반).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 ("pretty", "json", "compact")
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ScannerConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> ScannerResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("router.ema_alpha", 0.25)?
            .set_default("confluence.ttl_secs", 90)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("SCANNER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> ScannerResult<Self> {
        Self::load("config/default.toml")
    }
}
