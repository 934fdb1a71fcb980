//! 주입 가능한 난수 소스
//!
//! 인가 코드, 리프레시 토큰, TOTP 비밀키, 백업 코드, 소셜 state 값은 모두
//! [`RandomSource`]를 통해 생성됩니다. OS 엔트로피 소스가 실패하면
//! [`AppError::EntropyError`]를 반환하며, 호출자는 요청을 중단해야 합니다.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::errors::{AppError, AppResult};

/// 백업 코드용 문자 집합. 32자이므로 바이트 하위 5비트로 편향 없이 선택된다.
const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]) -> AppResult<()>;

    fn random_bytes(&self, len: usize) -> AppResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf)?;
        Ok(buf)
    }

    /// `len` 바이트 난수를 base64url(패딩 없음)로 인코딩한 불투명 토큰
    fn random_token(&self, len: usize) -> AppResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.random_bytes(len)?))
    }

    /// 대문자/숫자로 구성된 사람이 입력하기 쉬운 코드
    fn random_code(&self, len: usize) -> AppResult<String> {
        let bytes = self.random_bytes(len)?;
        Ok(bytes
            .iter()
            .map(|b| CODE_ALPHABET[(b & 0x1f) as usize] as char)
            .collect())
    }
}

/// 운영체제 CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, buf: &mut [u8]) -> AppResult<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            log::error!("🚨 OS 난수 소스 실패: {}", e);
            AppError::EntropyError(e.to_string())
        })
    }
}

/// 엔트로피 고갈을 흉내내는 테스트용 소스
#[cfg(test)]
pub struct FailingRandomSource;

#[cfg(test)]
impl RandomSource for FailingRandomSource {
    fn fill_bytes(&self, _buf: &mut [u8]) -> AppResult<()> {
        Err(AppError::EntropyError("entropy exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_is_url_safe_and_unique() {
        let rng = OsRandomSource;
        let a = rng.random_token(32).unwrap();
        let b = rng.random_token(32).unwrap();

        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_random_code_uses_unambiguous_alphabet() {
        let code = OsRandomSource.random_code(64).unwrap();

        assert_eq!(code.len(), 64);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        assert!(!code.contains('0') && !code.contains('O') && !code.contains('I'));
    }

    #[test]
    fn test_failing_source_surfaces_entropy_error() {
        let result = FailingRandomSource.random_token(32);
        assert!(matches!(result, Err(AppError::EntropyError(_))));
    }
}
