//! RFC 6238 TOTP 계산 (`totp-rs` 래퍼)
//!
//! 고정 파라미터: SHA1, 6자리, 30초 간격, 앞뒤 1 step 허용.
//! 비밀키는 20바이트 난수를 RFC 4648 base32(패딩 없음)로 인코딩해 다룹니다.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::core::errors::{AppError, AppResult};
use crate::utils::RandomSource;

pub const TOTP_DIGITS: usize = 6;
pub const TOTP_STEP_SECS: u64 = 30;
const TOTP_SKEW: u8 = 1;
const SECRET_BYTES: usize = 20;

pub fn generate_secret(random: &dyn RandomSource) -> AppResult<String> {
    let bytes = random.random_bytes(SECRET_BYTES)?;

    match Secret::Raw(bytes).to_encoded() {
        Secret::Encoded(encoded) => Ok(encoded),
        Secret::Raw(_) => Err(AppError::InternalError("TOTP 비밀키 인코딩 실패".to_string())),
    }
}

fn build(secret: &str, issuer: &str, account: &str) -> AppResult<TOTP> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| AppError::ValidationError(format!("유효하지 않은 TOTP 비밀키입니다: {:?}", e)))?;

    // otpauth 라벨에서 ':'는 issuer 구분자다
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP_SECS,
        bytes,
        Some(issuer.replace(':', "")),
        account.replace(':', ""),
    )
    .map_err(|e| AppError::ValidationError(format!("유효하지 않은 TOTP 비밀키입니다: {:?}", e)))
}

/// 6자리 숫자 코드가 `timestamp` 기준 현재 또는 인접 step과 일치하면 `true`.
pub fn verify_code(secret: &str, code: &str, timestamp: i64) -> bool {
    let code = code.trim();

    if code.len() != TOTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) || timestamp < 0 {
        return false;
    }

    match build(secret, "verify", "verify") {
        Ok(totp) => totp.check(code, timestamp as u64),
        Err(_) => false,
    }
}

/// 인증 앱 등록용 `otpauth://` URI와 QR PNG data URI
pub fn provisioning(secret: &str, issuer: &str, account: &str) -> AppResult<(String, String)> {
    let totp = build(secret, issuer, account)?;
    let qr_base64 = totp
        .get_qr_base64()
        .map_err(|e| AppError::InternalError(format!("QR 코드 생성 실패: {}", e)))?;

    Ok((totp.get_url(), format!("data:image/png;base64,{}", qr_base64)))
}

#[cfg(test)]
pub fn code_at(secret: &str, timestamp: i64) -> String {
    build(secret, "test", "test").unwrap().generate(timestamp as u64)
}
