//! OAuth2 엔드포인트 요청 DTO
//!
//! 폼/쿼리 값은 빈 문자열로 오는 경우가 많으므로 선택 필드는
//! [`deserialize_optional_string`]으로 `None`으로 정규화합니다.

use serde::Deserialize;
use validator::Validate;

use crate::utils::string_utils::deserialize_optional_string;

/// 표준 authorize 파라미터 (`GET /oauth/authorize`, `GET /auth/{provider}/oauth`)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthorizeParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub response_type: Option<String>,

    #[validate(length(min = 1, message = "client_id가 필요합니다"))]
    pub client_id: String,

    #[validate(length(min = 1, message = "redirect_uri가 필요합니다"))]
    pub redirect_uri: String,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub scope: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    #[validate(length(min = 43, max = 128, message = "code_challenge 길이가 올바르지 않습니다"))]
    pub code_challenge: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code_challenge_method: Option<String>,
}

/// 로그인 페이지가 제출하는 폼 (`POST /oauth/authorize`)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AuthorizeForm {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub response_type: Option<String>,

    #[validate(length(min = 1, message = "client_id가 필요합니다"))]
    pub client_id: String,

    #[validate(length(min = 1, message = "redirect_uri가 필요합니다"))]
    pub redirect_uri: String,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub scope: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    #[validate(length(min = 43, max = 128, message = "code_challenge 길이가 올바르지 않습니다"))]
    pub code_challenge: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code_challenge_method: Option<String>,

    #[validate(email(message = "유효한 이메일 주소를 입력해주세요"))]
    pub email: String,

    #[validate(length(min = 1, message = "비밀번호를 입력해주세요"))]
    pub password: String,

    /// TOTP 코드 또는 백업 코드
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub totp_code: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub two_factor_session_id: Option<String>,
}

impl AuthorizeForm {
    pub fn params(&self) -> AuthorizeParams {
        AuthorizeParams {
            response_type: self.response_type.clone(),
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            state: self.state.clone(),
            code_challenge: self.code_challenge.clone(),
            code_challenge_method: self.code_challenge_method.clone(),
        }
    }
}

/// `POST /oauth/token` 폼
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub redirect_uri: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub client_secret: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code_verifier: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub refresh_token: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub scope: Option<String>,

    /// 직접 로그인 코드용 nonce. 쿠키가 없을 때의 대체 전달 경로.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub direct_login_nonce: Option<String>,
}

/// `POST /oauth/revoke` 폼
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RevokeRequest {
    #[validate(length(min = 1, message = "token이 필요합니다"))]
    pub token: String,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub token_type_hint: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_params_normalize_empty_values() {
        let params: AuthorizeParams = serde_json::from_str(
            r#"{"client_id": "web", "redirect_uri": "https://app/cb", "code_challenge": "", "state": "xyz"}"#,
        )
        .unwrap();

        assert_eq!(params.code_challenge, None);
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_short_code_challenge_rejected() {
        let params: AuthorizeParams = serde_json::from_str(
            r#"{"client_id": "web", "redirect_uri": "https://app/cb", "code_challenge": "short"}"#,
        )
        .unwrap();

        assert!(params.validate().is_err());
    }
}
