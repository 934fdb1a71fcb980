//! OAuth2 HTTP Handlers
//!
//! 인가 엔드포인트, 토큰 엔드포인트, 폐기, userinfo를 처리합니다.
//!
//! # Endpoints
//!
//! - `GET /oauth/authorize`: 클라이언트/redirect_uri 검증 후 로그인 페이지
//! - `POST /oauth/authorize`: 비밀번호(+2FA) 로그인, 성공 시 `302 redirect_uri?code=..&state=..`
//! - `POST /oauth/token`: `authorization_code`, `refresh_token` 그랜트
//! - `POST /oauth/revoke`: 리프레시 토큰 폐기 (RFC 7009)
//! - `GET /oauth/userinfo`: Bearer, `openid` 스코프 필요
//!
//! 인가 단계의 오류는 클라이언트로 리다이렉트하지 않고 이 서버에서 응답합니다.

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{get, post, web, HttpRequest, HttpResponse, ResponseError};
use validator::Validate;

use crate::core::errors::AppError;
use crate::domain::dto::oauth::{AuthorizeForm, AuthorizeParams, RevokeRequest, TokenRequest};
use crate::domain::dto::two_factor::TwoFactorRequiredResponse;
use crate::domain::models::auth::AuthenticatedUser;
use crate::domain::models::tenant::TenantId;
use crate::handlers::pages::{html, login_page};
use crate::handlers::wants_json;
use crate::services::oauth::{AuthorizeOutcome, OAuthService, PasswordLogin};
use crate::services::social::DIRECT_LOGIN_NONCE_COOKIE;

/// 로그인 페이지 렌더링
///
/// # Endpoint
/// `GET /oauth/authorize?response_type=code&client_id=..&redirect_uri=..`
#[get("/oauth/authorize")]
pub async fn authorize_page(
    tenant: TenantId,
    query: web::Query<AuthorizeParams>,
) -> Result<HttpResponse, AppError> {
    let oauth_service = OAuthService::instance();
    oauth_service.validate_authorize(&tenant, &query).await?;

    Ok(html(StatusCode::OK, login_page(&tenant, &query, None, None)))
}

/// 로그인 폼 제출
///
/// 브라우저 요청에는 302 또는 로그인 페이지를, `Accept: application/json` 요청에는
/// 2FA 필요 여부를 JSON으로 응답합니다.
///
/// # Endpoint
/// `POST /oauth/authorize`
#[post("/oauth/authorize")]
pub async fn authorize_submit(
    req: HttpRequest,
    tenant: TenantId,
    form: web::Form<AuthorizeForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    form.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let oauth_service = OAuthService::instance();
    let params = form.params();
    let request = oauth_service.validate_authorize(&tenant, &params).await?;

    let login = PasswordLogin {
        email: form.email,
        password: form.password,
        totp_code: form.totp_code,
        two_factor_session_id: form.two_factor_session_id,
    };
    let json = wants_json(&req);

    match oauth_service.authorize(&tenant, &request, login).await {
        Ok(AuthorizeOutcome::Redirect(location)) => Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()),
        Ok(AuthorizeOutcome::TwoFactorRequired { session_id, expires_in }) if json => {
            Ok(HttpResponse::Ok().json(TwoFactorRequiredResponse {
                two_factor_required: true,
                session_id,
                expires_in,
            }))
        }
        Ok(AuthorizeOutcome::TwoFactorRequired { session_id, .. }) => Ok(html(
            StatusCode::OK,
            login_page(&tenant, &params, Some(&session_id), Some("인증 앱의 코드를 입력해주세요")),
        )),
        Err(AppError::AuthenticationError(message)) if !json => {
            let status = AppError::AuthenticationError(String::new()).status_code();
            Ok(html(status, login_page(&tenant, &params, None, Some(&message))))
        }
        Err(e) => Err(e),
    }
}

/// 토큰 엔드포인트
///
/// 직접 로그인 nonce 쿠키가 있으면 상환 증명으로 넘기고, 결과와 관계없이 쿠키를 지웁니다.
///
/// # Endpoint
/// `POST /oauth/token` (application/x-www-form-urlencoded)
#[post("/oauth/token")]
pub async fn token(
    req: HttpRequest,
    tenant: TenantId,
    form: web::Form<TokenRequest>,
) -> Result<HttpResponse, AppError> {
    let cookie_nonce = req.cookie(DIRECT_LOGIN_NONCE_COOKIE).map(|c| c.value().to_string());
    let had_cookie = cookie_nonce.is_some();

    let oauth_service = OAuthService::instance();
    let result = oauth_service.exchange_token(&tenant, form.into_inner(), cookie_nonce).await;

    let mut response = match result {
        Ok(tokens) => HttpResponse::Ok()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .insert_header((header::PRAGMA, "no-cache"))
            .json(tokens),
        Err(e) => {
            log::warn!("⚠️ 토큰 요청 실패: tenant={}, error={}", tenant, e.error_code());
            e.error_response()
        }
    };

    if had_cookie {
        let mut removal = Cookie::build(DIRECT_LOGIN_NONCE_COOKIE, "").path("/").finish();
        removal.make_removal();
        response
            .add_cookie(&removal)
            .map_err(|e| AppError::InternalError(format!("쿠키 설정 실패: {}", e)))?;
    }

    Ok(response)
}

/// # Endpoint
/// `POST /oauth/revoke`
#[post("/oauth/revoke")]
pub async fn revoke(
    tenant: TenantId,
    form: web::Form<RevokeRequest>,
) -> Result<HttpResponse, AppError> {
    form.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let oauth_service = OAuthService::instance();
    oauth_service.revoke(&tenant, &form).await?;

    Ok(HttpResponse::Ok().finish())
}

/// Bearer 토큰 소유자의 프로필 클레임
///
/// # Endpoint
/// `GET /oauth/userinfo`
pub async fn userinfo(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let oauth_service = OAuthService::instance();
    let claims = oauth_service.userinfo(&user).await?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(claims))
}
