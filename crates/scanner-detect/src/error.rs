//! 감지 모듈 에러 타입.

use thiserror::Error;

/// 감지 작업에서 발생할 수 있는 에러.
#[derive(Debug, Error)]
pub enum DetectError {
    /// ONNX 모델 로드 에러
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// 모델 추론 중 에러
    #[error("Inference error: {0}")]
    Inference(String),

    /// 차트 스타일 분류 에러
    #[error("Classification error: {0}")]
    Classification(String),

    /// 유효하지 않은 입력 데이터
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 추론 타임아웃
    #[error("Inference timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// 감지 작업을 위한 Result 타입.
pub type DetectResult<T> = Result<T, DetectError>;

impl DetectError {
    /// 이 에러가 모델 리로드를 필요로 하는지 확인.
    pub fn requires_reload(&self) -> bool {
        matches!(self, DetectError::ModelLoad(_))
    }
}

#[cfg(feature = "ml")]
impl From<ort::Error> for DetectError {
    fn from(err: ort::Error) -> Self {
        DetectError::Inference(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetectError::ModelLoad("file not found".to_string());
        assert_eq!(err.to_string(), "Model load error: file not found");

        let err = DetectError::Timeout { timeout_ms: 2000 };
        assert_eq!(err.to_string(), "Inference timed out after 2000ms");
    }

    #[test]
    fn test_requires_reload() {
        assert!(DetectError::ModelLoad("missing".to_string()).requires_reload());
        assert!(!DetectError::InvalidInput("empty frame".to_string()).requires_reload());
    }
}
