use serde::Serialize;

/// 등록 시작 결과. 비밀키와 백업 코드는 이 응답에서만 노출된다.
#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    pub otpauth_uri: String,
    /// `data:image/png;base64,...`
    pub qr_image: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorStatusResponse {
    pub enabled: bool,
    pub backup_codes_remaining: usize,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorVerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionVerifyResponse {
    pub verified: bool,
    pub expires_at: i64,
}

/// 비밀번호는 맞았지만 2FA 제출이 필요한 경우의 로그인 응답
#[derive(Debug, Serialize)]
pub struct TwoFactorRequiredResponse {
    pub two_factor_required: bool,
    pub session_id: String,
    pub expires_in: i64,
}
