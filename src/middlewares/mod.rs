//! 미들웨어 모듈
//!
//! # 제공 미들웨어
//!
//! ### 인증 미들웨어 (AuthMiddleware)
//! - Bearer 액세스 토큰 추출 및 검증
//! - 요청 테넌트와 토큰 테넌트 일치 확인
//! - 사용자 정보를 request extension에 저장
//! - 선택적 스코프 요구
//!
//! ```rust,ignore
//! use actix_web::{web, App};
//!
//! App::new()
//!     .service(
//!         web::scope("/2fa")
//!             .wrap(AuthMiddleware::required())
//!             .service(status)
//!     )
//!     .service(
//!         web::resource("/oauth/userinfo")
//!             .wrap(AuthMiddleware::required_with_scope("openid"))
//!             .route(web::get().to(userinfo))
//!     )
//! ```

pub mod auth_middleware;
mod auth_inner;

pub use auth_middleware::AuthMiddleware;
