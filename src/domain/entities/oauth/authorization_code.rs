//! 인가 코드 엔티티
//!
//! 코드는 `used=false`로 생성되고, 상환 시 단 한 번 `used=true`로 바뀌는 것 외에는
//! 변경되지 않습니다. `used=true`가 된 코드는 영구히 무효입니다.

use serde::{Deserialize, Serialize};

use crate::core::errors::AppError;
use crate::domain::models::tenant::TenantId;

/// 소셜 로그인 직접 로그인(continuation without client) 코드가 바인딩되는 가상 클라이언트
pub const DIRECT_LOGIN_CLIENT_ID: &str = "direct-login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "S256")]
    S256,
}

impl CodeChallengeMethod {
    /// 메서드 없이 challenge만 주어지면 RFC 7636에 따라 `plain`
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            None | Some("plain") => Ok(CodeChallengeMethod::Plain),
            Some("S256") => Ok(CodeChallengeMethod::S256),
            Some(other) => Err(AppError::ValidationError(format!(
                "지원하지 않는 code_challenge_method입니다: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::Plain => "plain",
            CodeChallengeMethod::S256 => "S256",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    #[serde(rename = "_id")]
    pub code: String,

    #[serde(default)]
    pub tenant_id: TenantId,

    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,

    #[serde(default)]
    pub code_challenge: Option<String>,

    #[serde(default)]
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// 직접 로그인 코드에만 존재. 브라우저 쿠키로 전달된 nonce의 SHA-256 hex.
    #[serde(default)]
    pub direct_login_nonce_hash: Option<String>,

    pub expires_at: i64,
    pub used: bool,

    #[serde(default)]
    pub used_at: Option<i64>,

    pub created_at: i64,
}

impl AuthorizationCode {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_direct_login(&self) -> bool {
        self.client_id == DIRECT_LOGIN_CLIENT_ID && self.direct_login_nonce_hash.is_some()
    }
}
