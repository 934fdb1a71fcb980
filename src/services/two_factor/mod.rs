//! 2단계 인증 서비스 모듈
//!
//! - [`totp`]: RFC 6238 코드 계산, 비밀키 생성, otpauth URI/QR
//! - [`two_factor_service`]: 등록, 검증, 백업 코드, step-up 세션

pub mod totp;
pub mod two_factor_service;

pub use two_factor_service::*;
