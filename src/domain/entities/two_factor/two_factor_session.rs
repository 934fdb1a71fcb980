use serde::{Deserialize, Serialize};

use crate::domain::models::tenant::TenantId;

/// 세션 하나에 허용되는 코드 검증 실패 횟수
pub const MAX_SESSION_ATTEMPTS: u32 = 5;

/// 비밀번호 확인 후 2FA 제출을 기다리는 단기 세션
///
/// `verified`는 `false → true`로 한 번만 바뀌며 되돌아가지 않습니다.
/// `expires_at`이 지나면 검증 여부와 관계없이 사용할 수 없습니다.
/// 실패가 [`MAX_SESSION_ATTEMPTS`]번 쌓이면 더 이상 검증할 수 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorSession {
    #[serde(rename = "_id")]
    pub session_id: String,

    #[serde(default)]
    pub tenant_id: TenantId,

    pub user_id: String,
    pub client_id: String,
    pub verified: bool,

    #[serde(default)]
    pub verified_at: Option<i64>,

    #[serde(default)]
    pub failed_attempts: u32,

    pub expires_at: i64,
    pub created_at: i64,
}

impl TwoFactorSession {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_verified_at(&self, now: i64) -> bool {
        self.verified && !self.is_expired_at(now)
    }

    pub fn is_locked(&self) -> bool {
        self.failed_attempts >= MAX_SESSION_ATTEMPTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_session_reports_unverified_after_expiry() {
        let session = TwoFactorSession {
            session_id: "s".to_string(),
            tenant_id: TenantId::default_tenant(),
            user_id: "u".to_string(),
            client_id: "c".to_string(),
            verified: true,
            verified_at: Some(100),
            failed_attempts: 0,
            expires_at: 400,
            created_at: 100,
        };

        assert!(session.is_verified_at(399));
        assert!(!session.is_verified_at(400));
    }

    #[test]
    fn test_session_locks_after_max_attempts() {
        let session: TwoFactorSession = serde_json::from_str(
            r#"{"_id": "s", "user_id": "u", "client_id": "c", "verified": false, "expires_at": 400, "created_at": 100}"#,
        )
        .unwrap();
        assert_eq!(session.failed_attempts, 0);
        assert!(!session.is_locked());

        let locked = TwoFactorSession { failed_attempts: MAX_SESSION_ATTEMPTS, ..session };
        assert!(locked.is_locked());
    }
}
