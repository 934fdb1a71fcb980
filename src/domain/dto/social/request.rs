use serde::Deserialize;

use crate::utils::string_utils::deserialize_optional_string;

/// 외부 제공자 콜백 쿼리
///
/// 사용자가 동의를 거부하면 `code` 대신 `error`가 온다.
#[derive(Debug, Deserialize)]
pub struct SocialCallbackQuery {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub error: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub error_description: Option<String>,
}

/// 직접 로그인 완료 페이지 쿼리 (`GET /auth/callback`)
#[derive(Debug, Deserialize)]
pub struct DirectLoginQuery {
    pub code: String,
}
