use thiserror::Error;

/// 학습 계층 에러.
#[derive(Error, Debug)]
pub enum LearningError {
    /// 저장소 접근 실패
    #[error("Storage error: {0}")]
    Storage(String),

    /// 직렬화/역직렬화 실패
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LearningError {
    /// 저장소 장애 여부.
    ///
    /// 저장소 장애는 학습 계층에서 기본값으로 degrade 가능하다.
    /// 스캔 파이프라인을 중단시키지 않는다.
    pub fn is_degradable(&self) -> bool {
        matches!(self, LearningError::Storage(_))
    }
}

impl From<sqlx::Error> for LearningError {
    fn from(err: sqlx::Error) -> Self {
        LearningError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LearningError {
    fn from(err: serde_json::Error) -> Self {
        LearningError::Serialization(err.to_string())
    }
}

/// 학습 계층 Result 타입
pub type LearningResult<T> = Result<T, LearningError>;
