//! 환경 변수 기반 설정 모듈
//!
//! - [`auth_config`]: JWT, 인가 코드, 2FA, 소셜 로그인 제공자
//! - [`data_config`]: 실행 환경, 서버, 저장소 백엔드, 발급자 URL, 테넌트 도메인

pub mod auth_config;
pub mod data_config;

pub use auth_config::*;
pub use data_config::*;
