//! 거래/연습 세션 결과 타입.

use serde::{Deserialize, Serialize};

/// 외부에서 기록되는 패턴 결과.
///
/// 적응형 confidence 엔진과 false-positive 억제기의 학습 입력입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// 성공한 거래/판단
    Win,
    /// 실패한 거래/판단
    Loss,
}

impl Outcome {
    /// 성공 여부.
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_win() {
        assert!(Outcome::Win.is_win());
        assert!(!Outcome::Loss.is_win());
    }
}
