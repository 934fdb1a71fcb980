//! PKCE 검증과 코드 상환 시 클라이언트 증명 판정
//!
//! 상환 한 번에 검증되는 증명은 정확히 하나입니다.
//!
//! | 코드 상태 | 요구되는 증명 |
//! |-----------|---------------|
//! | `code_challenge` 있음 | `code_verifier` (client_secret 유무와 무관) |
//! | challenge 없음, 직접 로그인 코드 | 직접 로그인 nonce |
//! | challenge 없음, 일반 코드 | 기밀 클라이언트의 `client_secret` |
//!
//! 직접 로그인 코드는 소셜 로그인 브로커가 `direct-login` 가상 클라이언트로 발급한
//! 코드에만 해당하며, 브라우저 쿠키로 전달된 일회용 nonce와 묶여 있습니다.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::core::errors::{AppError, AppResult};
use crate::domain::entities::oauth::{AuthorizationCode, CodeChallengeMethod, OAuthClient};
use crate::utils::digest::{constant_time_eq, sha256_hex};

const INVALID_GRANT: &str = "유효하지 않은 인가 코드 또는 검증자입니다";
const INVALID_CLIENT: &str = "클라이언트 인증에 실패했습니다";

/// 상환에 사용된 증명 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionProof {
    Pkce,
    ClientSecret,
    DirectLoginNonce,
}

pub fn compute_challenge(method: CodeChallengeMethod, verifier: &str) -> String {
    match method {
        CodeChallengeMethod::Plain => verifier.to_string(),
        CodeChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
    }
}

/// RFC 7636 §4.1: 43~128자, unreserved 문자만 허용
pub fn is_valid_verifier(verifier: &str) -> bool {
    (43..=128).contains(&verifier.len())
        && verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

pub fn verify_pkce(challenge: &str, method: CodeChallengeMethod, verifier: &str) -> bool {
    is_valid_verifier(verifier) && constant_time_eq(&compute_challenge(method, verifier), challenge)
}

/// 상환된 코드에 대해 클라이언트가 제시한 증명을 검사합니다.
///
/// `client`는 일반 클라이언트의 등록 정보이며, 직접 로그인 코드에서는 `None`입니다.
pub fn authenticate_redemption(
    code: &AuthorizationCode,
    client: Option<&OAuthClient>,
    client_secret: Option<&str>,
    code_verifier: Option<&str>,
    direct_login_nonce: Option<&str>,
) -> AppResult<RedemptionProof> {
    if let Some(challenge) = code.code_challenge.as_deref() {
        let verifier = code_verifier.ok_or_else(|| AppError::InvalidGrant(INVALID_GRANT.to_string()))?;
        let method = code.code_challenge_method.unwrap_or(CodeChallengeMethod::Plain);

        if !verify_pkce(challenge, method, verifier) {
            log::warn!("⚠️ PKCE 검증 실패: client_id={}", code.client_id);
            return Err(AppError::InvalidGrant(INVALID_GRANT.to_string()));
        }

        return Ok(RedemptionProof::Pkce);
    }

    if code_verifier.is_some() {
        return Err(AppError::InvalidGrant(INVALID_GRANT.to_string()));
    }

    if code.is_direct_login() {
        let expected = code.direct_login_nonce_hash.as_deref().unwrap_or_default();
        let matches = direct_login_nonce
            .map(|nonce| constant_time_eq(&sha256_hex(nonce), expected))
            .unwrap_or(false);

        if !matches {
            log::warn!("⚠️ 직접 로그인 nonce 불일치: user_id={}", code.user_id);
            return Err(AppError::InvalidGrant(INVALID_GRANT.to_string()));
        }

        return Ok(RedemptionProof::DirectLoginNonce);
    }

    let hash = client
        .and_then(|c| c.client_secret_hash.as_deref())
        .ok_or_else(|| AppError::InvalidClient("PKCE 또는 client_secret이 필요합니다".to_string()))?;
    let secret = client_secret.ok_or_else(|| AppError::InvalidClient(INVALID_CLIENT.to_string()))?;

    if !bcrypt::verify(secret, hash).unwrap_or(false) {
        log::warn!("⚠️ client_secret 불일치: client_id={}", code.client_id);
        return Err(AppError::InvalidClient(INVALID_CLIENT.to_string()));
    }

    Ok(RedemptionProof::ClientSecret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::oauth::DIRECT_LOGIN_CLIENT_ID;
    use crate::domain::models::tenant::TenantId;

    // RFC 7636 Appendix B
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    fn code(challenge: Option<&str>, method: Option<CodeChallengeMethod>) -> AuthorizationCode {
        AuthorizationCode {
            code: "c".to_string(),
            tenant_id: TenantId::default_tenant(),
            client_id: "web".to_string(),
            user_id: "u1".to_string(),
            redirect_uri: "https://app/cb".to_string(),
            scopes: vec!["read".to_string()],
            code_challenge: challenge.map(str::to_string),
            code_challenge_method: method,
            direct_login_nonce_hash: None,
            expires_at: i64::MAX,
            used: true,
            used_at: Some(0),
            created_at: 0,
        }
    }

    fn confidential_client(secret: &str) -> OAuthClient {
        OAuthClient {
            id: "1".to_string(),
            tenant_id: TenantId::default_tenant(),
            client_id: "web".to_string(),
            name: "Web".to_string(),
            client_secret_hash: Some(bcrypt::hash(secret, 4).unwrap()),
            redirect_uris: vec!["https://app/cb".to_string()],
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn test_s256_matches_rfc_vector() {
        assert_eq!(compute_challenge(CodeChallengeMethod::S256, VERIFIER), CHALLENGE);
        assert!(verify_pkce(CHALLENGE, CodeChallengeMethod::S256, VERIFIER));
    }

    #[test]
    fn test_plain_is_identity() {
        assert!(verify_pkce(VERIFIER, CodeChallengeMethod::Plain, VERIFIER));
        assert!(!verify_pkce(CHALLENGE, CodeChallengeMethod::Plain, VERIFIER));
    }

    #[test]
    fn test_verifier_format() {
        assert!(is_valid_verifier(VERIFIER));
        assert!(!is_valid_verifier("too-short"));
        assert!(!is_valid_verifier(&"a".repeat(129)));
        assert!(!is_valid_verifier(&format!("{}+", &VERIFIER[..43])));
    }

    #[test]
    fn test_wrong_verifier_fails_even_with_valid_secret() {
        let code = code(Some(CHALLENGE), Some(CodeChallengeMethod::S256));
        let client = confidential_client("s3cret");
        let wrong = "x".repeat(43);

        let result = authenticate_redemption(&code, Some(&client), Some("s3cret"), Some(&wrong), None);
        assert!(matches!(result, Err(AppError::InvalidGrant(_))));

        let missing = authenticate_redemption(&code, Some(&client), Some("s3cret"), None, None);
        assert!(matches!(missing, Err(AppError::InvalidGrant(_))));
    }

    #[test]
    fn test_correct_verifier_is_pkce_proof() {
        let code = code(Some(CHALLENGE), Some(CodeChallengeMethod::S256));
        let proof = authenticate_redemption(&code, None, None, Some(VERIFIER), None).unwrap();
        assert_eq!(proof, RedemptionProof::Pkce);
    }

    #[test]
    fn test_no_challenge_requires_client_secret() {
        let code = code(None, None);
        let client = confidential_client("s3cret");

        assert_eq!(
            authenticate_redemption(&code, Some(&client), Some("s3cret"), None, None).unwrap(),
            RedemptionProof::ClientSecret
        );
        assert!(matches!(
            authenticate_redemption(&code, Some(&client), Some("wrong"), None, None),
            Err(AppError::InvalidClient(_))
        ));
        assert!(matches!(
            authenticate_redemption(&code, Some(&client), None, None, None),
            Err(AppError::InvalidClient(_))
        ));
    }

    #[test]
    fn test_public_client_without_pkce_rejected() {
        let code = code(None, None);
        let mut client = confidential_client("unused");
        client.client_secret_hash = None;

        let result = authenticate_redemption(&code, Some(&client), None, None, None);
        assert!(matches!(result, Err(AppError::InvalidClient(_))));
    }

    #[test]
    fn test_verifier_without_stored_challenge_rejected() {
        let code = code(None, None);
        let client = confidential_client("s3cret");

        let result = authenticate_redemption(&code, Some(&client), Some("s3cret"), Some(VERIFIER), None);
        assert!(matches!(result, Err(AppError::InvalidGrant(_))));
    }

    #[test]
    fn test_direct_login_requires_matching_nonce() {
        let mut code = code(None, None);
        code.client_id = DIRECT_LOGIN_CLIENT_ID.to_string();
        code.direct_login_nonce_hash = Some(sha256_hex("nonce-1"));

        assert_eq!(
            authenticate_redemption(&code, None, None, None, Some("nonce-1")).unwrap(),
            RedemptionProof::DirectLoginNonce
        );
        assert!(authenticate_redemption(&code, None, None, None, Some("nonce-2")).is_err());
        assert!(authenticate_redemption(&code, None, None, None, None).is_err());
    }

    #[test]
    fn test_direct_login_client_id_without_nonce_binding_is_not_exempt() {
        let mut code = code(None, None);
        code.client_id = DIRECT_LOGIN_CLIENT_ID.to_string();

        let result = authenticate_redemption(&code, None, None, None, Some("anything"));
        assert!(matches!(result, Err(AppError::InvalidClient(_))));
    }
}
