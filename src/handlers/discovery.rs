//! OpenID Connect 탐색, JWKS, 헬스체크

use actix_web::{get, HttpResponse};
use serde_json::json;

use crate::domain::models::tenant::TenantId;
use crate::services::auth::TokenService;

fn openid_configuration(tenant: &TenantId) -> serde_json::Value {
    let token_service = TokenService::instance();
    let issuer = token_service.issuer_for(tenant);

    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/oauth/authorize", issuer),
        "token_endpoint": format!("{}/oauth/token", issuer),
        "revocation_endpoint": format!("{}/oauth/revoke", issuer),
        "userinfo_endpoint": format!("{}/oauth/userinfo", issuer),
        "jwks_uri": format!("{}/jwks", issuer),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["plain", "S256"],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "none"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["HS256"],
        "scopes_supported": ["openid", "profile", "email", "read"],
    })
}

/// # Endpoint
/// `GET /.well-known/openid-configuration`
#[get("/.well-known/openid-configuration")]
pub async fn openid_configuration_dash(tenant: TenantId) -> HttpResponse {
    HttpResponse::Ok().json(openid_configuration(&tenant))
}

/// 초기 클라이언트들이 사용하던 밑줄 표기
///
/// # Endpoint
/// `GET /.well-known/openid_configuration`
#[get("/.well-known/openid_configuration")]
pub async fn openid_configuration_underscore(tenant: TenantId) -> HttpResponse {
    HttpResponse::Ok().json(openid_configuration(&tenant))
}

/// 서명 키 메타데이터. HS256 대칭키이므로 `k` 값은 공개하지 않습니다.
///
/// # Endpoint
/// `GET /jwks`
#[get("/jwks")]
pub async fn jwks() -> HttpResponse {
    let token_service = TokenService::instance();
    HttpResponse::Ok()
        .insert_header(("Cache-Control", "public, max-age=300"))
        .json(token_service.jwks())
}

/// 서비스 상태를 확인하는 헬스체크 엔드포인트
///
/// ```bash
/// curl http://localhost:8080/health
/// ```
#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
