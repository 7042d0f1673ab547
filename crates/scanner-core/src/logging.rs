//! tracing 로깅 초기화.
//!
//! 호스트 앱이 [`crate::config::LoggingConfig`]로 한 번 호출합니다.
//! `RUST_LOG`가 설정돼 있으면 설정 파일의 레벨보다 우선합니다.

use crate::config::LoggingConfig;
use crate::error::{ScannerError, ScannerResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 사람이 읽기 쉬운 형식 (개발용)
    #[default]
    Pretty,
    /// 로그 집계용 JSON 형식 (운영용)
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
pub fn init_logging(config: &LoggingConfig) -> ScannerResult<()> {
    let format: LogFormat = config.format.parse().map_err(ScannerError::Config)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ScannerError::Config(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let initialized = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_file(true).with_line_number(true))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    initialized.map_err(|e| ScannerError::Config(e.to_string()))?;

    tracing::info!(
        format = ?format,
        level = %config.level,
        "Logging initialized"
    );
    Ok(())
}
