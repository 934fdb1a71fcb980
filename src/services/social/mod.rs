//! 소셜 로그인 모듈
//!
//! - [`provider`]: 제공자 트레이트, 설정 기반 디렉터리, 공통 HTTP 헬퍼
//! - [`google`], [`github`], [`facebook`], [`apple`]: 제공자 구현
//! - [`broker`]: state 발급/검증과 OAuth2 흐름 재개

pub mod apple;
pub mod broker;
pub mod facebook;
pub mod github;
pub mod google;
pub mod provider;

pub use broker::*;
pub use provider::{ProviderDirectory, SocialProvider};
