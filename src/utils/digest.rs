use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 저장용 SHA-256 hex 다이제스트 (리프레시 토큰, 백업 코드, nonce)
pub fn sha256_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// 길이가 다르면 즉시 `false`, 같으면 상수 시간 비교
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
