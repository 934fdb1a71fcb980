//! # Core Module
//!
//! 서비스 레지스트리와 애플리케이션 전역 에러 타입을 제공합니다.
//!
//! ## 모듈 구성
//!
//! ### [`registry`] - 서비스 로케이터
//! - **ServiceLocator**: 타입 기반 싱글톤 저장소 (`Arc<T>`)
//! - **자동 등록**: `inventory::submit!`으로 컴파일 타임에 생성자 등록
//! - **초기화**: `initialize_all()`이 등록된 모든 서비스를 생성
//!
//! ### [`errors`] - 에러 처리
//! - **AppError**: OAuth2 오류 코드(`invalid_grant`, `invalid_client` 등)로 매핑되는 에러
//! - **HTTP 통합**: `ResponseError` 구현, `{"error", "error_description"}` 본문
//!
//! ## 사용 패턴
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenant_oauth_server::core::registry::ServiceLocator;
//! use tenant_oauth_server::repositories::Repositories;
//!
//! // 1. 저장소 묶음 등록
//! ServiceLocator::set(Arc::new(Repositories::in_memory()));
//!
//! // 2. 모든 서비스 초기화
//! ServiceLocator::initialize_all().await?;
//!
//! // 3. 사용
//! let oauth_service = OAuthService::instance();
//! ```
//!
//! ## 트러블슈팅
//!
//! ```text
//! panic: ServiceLocator에 등록되지 않은 타입입니다: tenant_oauth_server::repositories::Repositories
//! ```
//! **해결**: `initialize_all()` 이전에 `ServiceLocator::set()`으로 저장소를 등록

pub mod errors;
pub mod registry;

pub use errors::*;
pub use registry::*;
