//! OAuth2 프로토콜 엔진
//!
//! - [`authorization_code_service`]: 단일 사용 인가 코드 발급/상환, 스코프 축소
//! - [`pkce`]: PKCE 검증과 상환 시 클라이언트 증명 판정
//! - [`oauth_service`]: authorize/token/revoke/userinfo 흐름 조합

pub mod authorization_code_service;
pub mod oauth_service;
pub mod pkce;

pub use authorization_code_service::*;
pub use oauth_service::*;
