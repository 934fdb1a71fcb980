//! # Application Error Handling System
//!
//! 인가 서버 전역에서 사용하는 통합 에러 타입입니다.
//! 모든 계층(리포지토리, 서비스, 핸들러)은 [`AppError`]를 반환하고,
//! Actix-Web의 [`ResponseError`](actix_web::ResponseError) 구현을 통해
//! OAuth2 에러 응답 형식으로 자동 변환됩니다.
//!
//! ## 응답 형식
//!
//! ```json
//! {
//!   "error": "invalid_grant",
//!   "error_description": "유효하지 않은 인가 코드입니다"
//! }
//! ```
//!
//! `error` 필드는 클라이언트가 분기할 수 있는 안정적인 코드이며,
//! `error_description`은 사람이 읽기 위한 메시지입니다.
//!
//! ## 에러 분류
//!
//! | 분류 | 변형 | 상태 코드 |
//! |------|------|-----------|
//! | 클라이언트 오류 | `ValidationError`, `InvalidClient`, `InvalidGrant`, `UnsupportedGrantType` | 400 / 401 |
//! | 인증 실패 | `AuthenticationError` | 401 |
//! | 권한 부족 | `AuthorizationError` | 403 |
//! | 업스트림 실패 | `ExternalServiceError` | 502 |
//! | 설정 오류 | `ConfigurationError`, `NotImplemented` | 503 / 501 |
//! | 서버 내부 | `DatabaseError`, `RedisError`, `EntropyError`, `InternalError` | 500 |
//!
//! 인증 실패 메시지는 어떤 요소(비밀번호, 코드, PKCE 검증자 등)가 실패했는지
//! 드러내지 않는 일반적인 문구를 사용해야 합니다.
//!
//! 5xx 계열은 응답 시점에 상세 원인을 로그로 남기고, 클라이언트에는
//! 일반 메시지만 노출합니다.

use actix_web::ResponseError;
use actix_web::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Redis error: {0}")]
    RedisError(String),

    /// 잘못되었거나 누락된 요청 파라미터 (`invalid_request`)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 알 수 없는 클라이언트 또는 클라이언트 인증 실패
    #[error("Invalid client: {0}")]
    InvalidClient(String),

    /// 인가 코드/리프레시 토큰/PKCE 검증 실패
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// 기존 부여 범위를 넘는 스코프 요청
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict error: {0}")]
    ConflictError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// 외부 아이덴티티 제공자 호출 실패 (타임아웃, 비정상 응답)
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 제공자 미설정 등 첫 사용 시점에 드러나는 설정 오류
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// 난수 소스 실패. 약한 값으로 진행하지 않고 요청을 중단한다.
    #[error("Entropy source failure: {0}")]
    EntropyError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 응답 본문의 `error` 필드에 들어가는 안정적인 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "invalid_request",
            AppError::InvalidClient(_) => "invalid_client",
            AppError::InvalidGrant(_) => "invalid_grant",
            AppError::UnsupportedGrantType(_) => "unsupported_grant_type",
            AppError::InvalidScope(_) => "invalid_scope",
            AppError::NotFound(_) => "not_found",
            AppError::ConflictError(_) => "conflict",
            AppError::AuthenticationError(_) => "access_denied",
            AppError::AuthorizationError(_) => "insufficient_scope",
            AppError::ExternalServiceError(_) => "upstream_error",
            AppError::ConfigurationError(_) => "provider_not_configured",
            AppError::NotImplemented(_) => "not_implemented",
            AppError::DatabaseError(_)
            | AppError::RedisError(_)
            | AppError::EntropyError(_)
            | AppError::InternalError(_) => "server_error",
        }
    }

    fn description(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::InvalidClient(msg)
            | AppError::InvalidGrant(msg)
            | AppError::UnsupportedGrantType(msg)
            | AppError::InvalidScope(msg)
            | AppError::NotFound(msg)
            | AppError::ConflictError(msg)
            | AppError::AuthenticationError(msg)
            | AppError::AuthorizationError(msg)
            | AppError::ConfigurationError(msg)
            | AppError::NotImplemented(msg) => msg.clone(),
            AppError::ExternalServiceError(_) => "외부 인증 제공자와 통신하지 못했습니다".to_string(),
            AppError::DatabaseError(_)
            | AppError::RedisError(_)
            | AppError::EntropyError(_)
            | AppError::InternalError(_) => "내부 서버 오류가 발생했습니다".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidScope(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigurationError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("❌ 요청 처리 실패 [{}]: {}", status.as_u16(), self);
        }

        actix_web::HttpResponse::build(status)
            .insert_header(("Cache-Control", "no-store"))
            .json(serde_json::json!({
                "error": self.error_code(),
                "error_description": self.description(),
            }))
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> AppResult<T>;

    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", msg, e)))
    }

    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", f(), e)))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::RedisError(e.to_string())
    }
}
