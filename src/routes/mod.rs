//! API 라우트 설정 모듈
//!
//! 모든 엔드포인트는 기본 테넌트용 루트 경로와 `/t/{tenant}` 아래에 같은 모양으로 등록됩니다.
//! 테넌트는 핸들러와 미들웨어가 [`TenantId`](crate::domain::models::tenant::TenantId)로 해석합니다.
//!
//! # Route Groups
//!
//! ## Public
//! - `GET|POST /oauth/authorize`, `POST /oauth/token`, `POST /oauth/revoke`
//! - `GET /auth/{provider}/login|oauth|callback`, `GET /auth/callback`
//! - `POST /2fa/verify-session`
//! - `GET /.well-known/openid-configuration`, `GET /jwks`, `GET /health`
//!
//! ## Bearer 필요
//! - `GET /oauth/userinfo` (`openid` 스코프)
//! - `POST /2fa/setup|enable|disable|verify`, `GET /2fa/status`
//!
//! # Examples
//!
//! ```rust,ignore
//! use actix_web::App;
//!
//! let app = App::new().configure(configure_all_routes);
//! ```

use actix_web::web;

use crate::handlers;
use crate::middlewares::AuthMiddleware;

/// 모든 라우트를 설정합니다
pub fn configure_all_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::discovery::health_check);

    cfg.service(web::scope("/t/{tenant}").configure(configure_tenant_routes));
    configure_tenant_routes(cfg);
}

/// 테넌트 범위 라우트. 루트와 `/t/{tenant}`에 두 번 등록됩니다.
fn configure_tenant_routes(cfg: &mut web::ServiceConfig) {
    configure_oauth_routes(cfg);
    configure_social_routes(cfg);
    configure_two_factor_routes(cfg);
    configure_discovery_routes(cfg);
}

fn configure_oauth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::oauth::authorize_page)
        .service(handlers::oauth::authorize_submit)
        .service(handlers::oauth::token)
        .service(handlers::oauth::revoke)
        .service(
            web::resource("/oauth/userinfo")
                .wrap(AuthMiddleware::required_with_scope("openid"))
                .route(web::get().to(handlers::oauth::userinfo)),
        );
}

fn configure_social_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::pages::direct_login_callback)
        .service(handlers::social::social_login)
        .service(handlers::social::social_oauth)
        .service(handlers::social::social_callback);
}

/// `verify-session`은 공개 라우트이므로 보호된 `/2fa` 스코프보다 먼저 등록합니다.
fn configure_two_factor_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::two_factor::verify_session);

    cfg.service(
        web::scope("/2fa")
            .wrap(AuthMiddleware::required())
            .service(handlers::two_factor::setup)
            .service(handlers::two_factor::enable)
            .service(handlers::two_factor::disable)
            .service(handlers::two_factor::verify)
            .service(handlers::two_factor::status),
    );
}

fn configure_discovery_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::discovery::openid_configuration_dash)
        .service(handlers::discovery::openid_configuration_underscore)
        .service(handlers::discovery::jwks);
}
