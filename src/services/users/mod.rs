//! 사용자 서비스 모듈
//!
//! 인가 흐름이 필요로 하는 사용자 조회, 비밀번호 인증, 소셜 사용자 해석을 담당합니다.
//!
//! # Security
//!
//! - bcrypt 비밀번호 검증
//! - 사용자 존재 여부를 드러내지 않는 공통 에러 메시지
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::services::users::UserService;
//!
//! let user_service = UserService::instance();
//! let user = user_service.authenticate_password(&tenant, "user@example.com", "pw").await?;
//! ```

pub mod user_service;

pub use user_service::*;
