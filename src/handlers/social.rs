//! Social Login HTTP Handlers
//!
//! # Endpoints
//!
//! - `GET /auth/{provider}/login`: 직접 로그인 시작
//! - `GET /auth/{provider}/oauth?client_id=..&redirect_uri=..`: 진행 중인 OAuth2 요청을 보존하며 시작
//! - `GET /auth/{provider}/callback?code=..&state=..`: 제공자 콜백

use actix_web::cookie::{Cookie, SameSite};
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::http::header;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::config::{AuthCodeConfig, AuthProvider, IssuerConfig};
use crate::core::errors::AppError;
use crate::domain::dto::oauth::AuthorizeParams;
use crate::domain::dto::social::SocialCallbackQuery;
use crate::domain::models::tenant::TenantId;
use crate::services::social::{SocialLoginBroker, SocialLoginResult, DIRECT_LOGIN_NONCE_COOKIE};

/// `/t/{tenant}` 아래에서도 쓰이므로 이름으로 추출한다
#[derive(Debug, Deserialize)]
pub struct ProviderPath {
    provider: String,
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

/// # Endpoint
/// `GET /auth/{provider}/login`
#[get("/auth/{provider}/login")]
pub async fn social_login(
    tenant: TenantId,
    path: web::Path<ProviderPath>,
) -> Result<HttpResponse, AppError> {
    let provider = AuthProvider::social_from_str(&path.provider)?;

    let broker = SocialLoginBroker::instance();
    let auth_url = broker.begin_federated_login(provider, &tenant, None).await?;

    Ok(redirect(auth_url))
}

/// # Endpoint
/// `GET /auth/{provider}/oauth?client_id=..&redirect_uri=..&state=..&code_challenge=..`
#[get("/auth/{provider}/oauth")]
pub async fn social_oauth(
    tenant: TenantId,
    path: web::Path<ProviderPath>,
    query: web::Query<AuthorizeParams>,
) -> Result<HttpResponse, AppError> {
    let provider = AuthProvider::social_from_str(&path.provider)?;
    let original = SocialLoginBroker::original_from_params(&query)?;

    let broker = SocialLoginBroker::instance();
    let auth_url = broker.begin_federated_login(provider, &tenant, Some(original)).await?;

    Ok(redirect(auth_url))
}

/// 제공자 콜백
///
/// 직접 로그인이면 nonce를 `HttpOnly`, `SameSite=Lax` 쿠키로 내려보냅니다.
///
/// # Endpoint
/// `GET /auth/{provider}/callback?code={code}&state={state}`
#[get("/auth/{provider}/callback")]
pub async fn social_callback(
    tenant: TenantId,
    path: web::Path<ProviderPath>,
    query: web::Query<SocialCallbackQuery>,
) -> Result<HttpResponse, AppError> {
    let provider = AuthProvider::social_from_str(&path.provider)?;

    let broker = SocialLoginBroker::instance();
    match broker.handle_callback(provider, &tenant, &query).await? {
        SocialLoginResult::Redirect(location) => Ok(redirect(location)),
        SocialLoginResult::DirectLogin { redirect_url, nonce } => {
            let cookie = Cookie::build(DIRECT_LOGIN_NONCE_COOKIE, nonce)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(IssuerConfig::base_url().starts_with("https://"))
                .max_age(CookieDuration::minutes(AuthCodeConfig::ttl_minutes()))
                .finish();

            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, redirect_url))
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .cookie(cookie)
                .finish())
        }
    }
}
