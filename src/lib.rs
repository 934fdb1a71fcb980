//! 멀티 테넌트 OAuth2 / OpenID Connect 인가 서버
//!
//! 하나의 배포에서 여러 테넌트를 격리하여 서비스하는 인가 서버입니다.
//! 테넌트는 경로(`/t/{tenant}`), `X-Tenant-ID` 헤더, 서브도메인 순으로 결정됩니다.
//!
//! # Features
//!
//! - **Authorization Code + PKCE**: `plain`/`S256`, 1회용 코드, 리프레시 토큰 회전
//! - **OpenID Connect**: ID 토큰, userinfo, 테넌트별 discovery 문서
//! - **소셜 로그인**: Google, GitHub, Facebook 브로커 (원래 인가 요청 보존)
//! - **TOTP 2단계 인증**: 등록, 백업 코드, step-up 세션
//! - **MongoDB + Redis**: 영구 저장소와 단기 상태 저장소, 또는 인메모리 실행
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Routes   │ ← 테넌트 스코프 라우팅
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Handlers     │ ← 요청/응답, HTML 로그인 페이지
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Services     │ ← OAuth2, 토큰, 소셜 브로커, 2FA
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Repositories   │ ← 테넌트 범위 저장소 트레이트
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ MongoDB + Redis │ ← 또는 인메모리
//! └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use tenant_oauth_server::services::oauth::OAuthService;
//!
//! let oauth_service = OAuthService::instance();
//! let request = oauth_service.validate_authorize(&tenant, &params).await?;
//! ```

pub mod core;
pub mod config;
pub mod db;
pub mod caching;
pub mod domain;
pub mod repositories;
pub mod services;
pub mod utils;
pub mod routes;
pub mod handlers;
pub mod middlewares;
