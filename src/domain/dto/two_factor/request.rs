use serde::Deserialize;
use validator::Validate;

/// `POST /2fa/enable`
#[derive(Debug, Deserialize, Validate)]
pub struct EnableTwoFactorRequest {
    #[validate(length(min = 6, max = 32, message = "인증 코드를 입력해주세요"))]
    pub code: String,

    #[validate(length(min = 16, message = "비밀키가 필요합니다"))]
    pub secret: String,
}

/// `POST /2fa/verify`, `POST /2fa/disable`
#[derive(Debug, Deserialize, Validate)]
pub struct TwoFactorCodeRequest {
    #[validate(length(min = 6, max = 32, message = "인증 코드를 입력해주세요"))]
    pub code: String,
}

/// `POST /2fa/verify-session`
#[derive(Debug, Deserialize, Validate)]
pub struct VerifySessionRequest {
    #[validate(length(min = 1, message = "session_id가 필요합니다"))]
    pub session_id: String,

    #[validate(length(min = 6, max = 32, message = "인증 코드를 입력해주세요"))]
    pub code: String,
}
