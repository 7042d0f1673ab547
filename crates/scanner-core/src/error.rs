//! 스캐너 공통 에러 타입.
//!
//! 스캔 경로의 실패는 각 크레이트의 에러 타입이 담당하고 중립
//! 기본값으로 degrade됩니다. 이 타입은 호스트가 직접 처리해야 하는
//! 설정/조립 단계 실패만 표현합니다.

use thiserror::Error;

/// 설정/조립 단계 에러.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// 설정 로드/초기화 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 스캐너 작업을 위한 Result 타입.
pub type ScannerResult<T> = Result<T, ScannerError>;

impl From<config::ConfigError> for ScannerError {
    fn from(err: config::ConfigError) -> Self {
        ScannerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ScannerError {
    fn from(err: serde_json::Error) -> Self {
        ScannerError::Serialization(err.to_string())
    }
}
