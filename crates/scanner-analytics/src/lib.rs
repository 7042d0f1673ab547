//! # Scanner Analytics
//!
//! 다중 타임프레임 confluence 캐시와 tradeability 스코어러를 제공합니다.
//!
//! - **ConfluenceCache**: 타임프레임별 감지 결과를 TTL과 함께 보관하고
//!   타임프레임 간 합의 점수를 계산
//! - **TradeabilityScorer**: 감지 confidence + 합의 + 시장 컨텍스트를
//!   하나의 실행 가능성 점수로 결합

pub mod confluence;
pub mod tradeability;

pub use confluence::ConfluenceCache;
pub use tradeability::{
    TradeabilityInput, TradeabilityLabel, TradeabilityResult, TradeabilityScorer,
};
