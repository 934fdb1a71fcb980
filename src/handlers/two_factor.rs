//! Two-Factor HTTP Handlers
//!
//! `/2fa` 스코프는 [`AuthMiddleware`](crate::middlewares::AuthMiddleware)로 보호되며,
//! `verify-session`만 공개입니다 (세션 ID 자체가 권한).

use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::core::errors::AppError;
use crate::domain::dto::two_factor::{EnableTwoFactorRequest, TwoFactorCodeRequest, TwoFactorVerifyResponse, VerifySessionRequest};
use crate::domain::models::auth::AuthenticatedUser;
use crate::domain::models::tenant::TenantId;
use crate::services::two_factor::TwoFactorService;

/// 등록 시작: 비밀키, otpauth URI, QR, 백업 코드를 한 번만 반환합니다.
///
/// # Endpoint
/// `POST /2fa/setup`
#[post("/setup")]
pub async fn setup(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let two_factor_service = TwoFactorService::instance();
    let response = two_factor_service.begin_enrollment(&user.tenant_id, &user.user_id).await?;

    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(response))
}

/// # Endpoint
/// `POST /2fa/enable`
#[post("/enable")]
pub async fn enable(
    user: AuthenticatedUser,
    payload: web::Json<EnableTwoFactorRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let two_factor_service = TwoFactorService::instance();
    two_factor_service
        .confirm_enrollment(&user.tenant_id, &user.user_id, &payload.code, &payload.secret)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "enabled": true })))
}

/// # Endpoint
/// `POST /2fa/disable`
#[post("/disable")]
pub async fn disable(
    user: AuthenticatedUser,
    payload: web::Json<TwoFactorCodeRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let two_factor_service = TwoFactorService::instance();
    two_factor_service.disable(&user.tenant_id, &user.user_id, &payload.code).await?;

    Ok(HttpResponse::Ok().json(json!({ "enabled": false })))
}

/// # Endpoint
/// `POST /2fa/verify`
#[post("/verify")]
pub async fn verify(
    user: AuthenticatedUser,
    payload: web::Json<TwoFactorCodeRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let two_factor_service = TwoFactorService::instance();
    let verified = two_factor_service.verify_challenge(&user.tenant_id, &user.user_id, &payload.code).await?;

    Ok(HttpResponse::Ok().json(TwoFactorVerifyResponse { verified }))
}

/// # Endpoint
/// `GET /2fa/status`
#[get("/status")]
pub async fn status(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let two_factor_service = TwoFactorService::instance();
    let status = two_factor_service.status(&user.tenant_id, &user.user_id).await?;

    Ok(HttpResponse::Ok().json(status))
}

/// step-up 세션 검증 (공개)
///
/// # Endpoint
/// `POST /2fa/verify-session`
#[post("/2fa/verify-session")]
pub async fn verify_session(
    tenant: TenantId,
    payload: web::Json<VerifySessionRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let two_factor_service = TwoFactorService::instance();
    let response = two_factor_service.verify_session(&tenant, &payload.session_id, &payload.code).await?;

    Ok(HttpResponse::Ok().json(response))
}
