//! 도메인 계층
//!
//! - [`entities`]: MongoDB 문서와 매핑되는 영속 엔티티
//! - [`models`]: 테넌트, 토큰 클레임, 인증 주체 등 비영속 모델
//! - [`dto`]: HTTP 요청/응답 형식

pub mod dto;
pub mod entities;
pub mod models;
