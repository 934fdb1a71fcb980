//! 토큰 서비스 모듈
//!
//! JWT 액세스/ID 토큰 서명과 검증, 불투명 리프레시 토큰의 발급/회전/폐기를 담당합니다.
//!
//! # Security
//!
//! - HMAC-SHA256 토큰 서명 (`kid` 헤더 포함)
//! - 리프레시 토큰은 SHA-256 해시로만 저장
//! - 토큰 테넌트와 요청 테넌트 불일치 시 거부
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::auth::TokenService;
//!
//! let token_service = TokenService::instance();
//! let tokens = token_service.issue_tokens(&subject).await?;
//! ```

pub mod token_service;

pub use token_service::*;
