//! 토큰 클레임과 토큰 엔드포인트 응답 모델

use serde::{Deserialize, Serialize};

use crate::domain::models::tenant::TenantId;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// 액세스 토큰(JWT) 클레임
///
/// 검증은 서명과 `exp`만으로 이루어지며 저장소를 조회하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub tenant_id: TenantId,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub groups: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// `openid` 스코프가 부여되었을 때 함께 발급하는 ID 토큰 클레임
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub tenant_id: TenantId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

/// 토큰 발급 대상
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub tenant_id: TenantId,
    pub user_id: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub groups: Vec<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// `POST /oauth/token` 성공 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}
