//! HTTP 요청/응답 DTO

pub mod oauth;
pub mod social;
pub mod two_factor;
