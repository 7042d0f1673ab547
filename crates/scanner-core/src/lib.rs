//! # Scanner Core
//!
//! 차트 패턴 스캐너의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 스캐너 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 패턴 감지 타입 (Detection, BoundingBox)
//! - 차트 스타일 및 분류 관측
//! - 프레임 버퍼 capability 추상화
//! - 결과(Win/Loss) 타입
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
