//! 소셜 로그인 브로커가 주고받는 모델

use serde::{Deserialize, Serialize};

use crate::config::AuthProvider;
use crate::domain::entities::oauth::CodeChallengeMethod;
use crate::domain::models::tenant::TenantId;

/// 외부 제공자가 발급한 액세스 토큰
#[derive(Debug, Clone)]
pub struct ExternalToken {
    pub access_token: String,
}

/// 제공자별 프로필을 정규화한 결과
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalProfile {
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// 소셜 로그인 왕복 동안 보존해야 하는 원래의 OAuth2 인가 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalAuthRequest {
    pub client_id: String,
    pub redirect_uri: String,

    #[serde(default)]
    pub original_state: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub code_challenge: Option<String>,

    #[serde(default)]
    pub code_challenge_method: Option<CodeChallengeMethod>,
}

/// 랜덤 state 값을 키로 저장되는 대기 중 소셜 로그인
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSocialLogin {
    pub provider: AuthProvider,
    pub tenant_id: TenantId,

    #[serde(default)]
    pub original: Option<OriginalAuthRequest>,

    pub created_at: i64,
    pub expires_at: i64,
}

impl PendingSocialLogin {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
