//! 영속 엔티티
//!
//! 모든 엔티티는 `tenant_id`를 가지며, 저장소 계층의 모든 조회 필터에 포함됩니다.

pub mod oauth;
pub mod two_factor;
pub mod users;
