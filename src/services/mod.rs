//! 비즈니스 로직을 담당하는 서비스 계층 모듈
//!
//! 각 서비스는 `instance()`로 얻는 싱글톤이며, `inventory`에 등록되어
//! 서버 시작 시 [`ServiceLocator::initialize_all`](crate::core::registry::ServiceLocator::initialize_all)로 미리 생성됩니다.
//! 생성자는 저장소, 시계, 난수 소스를 직접 받으므로 테스트에서는 인메모리 구현으로 조립합니다.
//!
//! # Features
//!
//! - 인가 코드 발급/상환과 PKCE 검증
//! - JWT 액세스 토큰, 리프레시 토큰 회전, ID 토큰
//! - TOTP 2단계 인증과 step-up 세션
//! - 소셜 로그인 브로커 (Google, GitHub, Facebook)
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::{oauth::OAuthService, auth::TokenService};
//!
//! let oauth_service = OAuthService::instance();
//! let token_service = TokenService::instance();
//! ```

pub mod auth;
pub mod oauth;
pub mod social;
pub mod two_factor;
pub mod users;
