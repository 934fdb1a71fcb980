//! # HTTP Request Handlers Module
//!
//! HTTP 요청을 받아 서비스 계층을 호출하고 응답으로 변환하는 핸들러 함수들입니다.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//!   Client (Browser, SPA, 백엔드 클라이언트)
//! └─────────────────────┬───────────────────────┘
//!                       │ HTTP Request/Response
//! ┌─────────────────────▼───────────────────────┐
//!   Handlers (이 모듈)                              ← Web Layer
//! ├─────────────────────────────────────────────┤
//!   Services - 프로토콜 엔진                         ← Service Layer
//! ├─────────────────────────────────────────────┤
//!   Repositories - 테넌트 범위 저장소                 ← Repository Layer
//! └─────────────────────────────────────────────┘
//! ```
//!
//! 모든 핸들러는 [`TenantId`](crate::domain::models::tenant::TenantId) 추출자로 테넌트를 받으며,
//! 같은 핸들러가 루트와 `/t/{tenant}` 아래에 함께 등록됩니다.
//!
//! ## 모듈 구성
//! - **`oauth`**: `/oauth/authorize`, `/oauth/token`, `/oauth/revoke`, `/oauth/userinfo`
//! - **`pages`**: 로그인 페이지와 직접 로그인 완료 페이지 (`/auth/callback`)
//! - **`social`**: `/auth/{provider}/login`, `/auth/{provider}/oauth`, `/auth/{provider}/callback`
//! - **`two_factor`**: `/2fa/*`
//! - **`discovery`**: OpenID 설정, JWKS, 헬스체크

use actix_web::HttpRequest;
use actix_web::http::header;

pub mod discovery;
pub mod oauth;
pub mod pages;
pub mod social;
pub mod two_factor;

/// 브라우저 폼 제출이 아닌 API 호출인지 판단합니다.
pub(crate) fn wants_json(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Once};

    use crate::core::registry::ServiceLocator;
    use crate::repositories::Repositories;

    static INIT: Once = Once::new();

    /// 서비스 싱글톤이 사용할 인메모리 저장소를 한 번만 등록합니다.
    pub fn init_services() {
        INIT.call_once(|| {
            ServiceLocator::set(Arc::new(Repositories::in_memory()));
        });
    }

    pub fn repositories() -> Arc<Repositories> {
        init_services();
        ServiceLocator::get::<Repositories>()
    }
}
