use serde::{Deserialize, Serialize};

use crate::domain::models::tenant::TenantId;

/// 리프레시 토큰 레코드
///
/// 토큰 원문은 저장하지 않고 SHA-256 hex(`_id`)로만 조회합니다.
/// 폐기는 `revoked=true`로의 논리 삭제입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    #[serde(rename = "_id")]
    pub token_hash: String,

    #[serde(default)]
    pub tenant_id: TenantId,

    /// 함께 발급된 액세스 토큰의 `jti`
    pub access_token_id: String,

    pub client_id: String,
    pub user_id: String,
    pub scopes: Vec<String>,
    pub expires_at: i64,
    pub revoked: bool,

    #[serde(default)]
    pub revoked_at: Option<i64>,

    pub created_at: i64,
}

impl RefreshToken {
    pub fn is_active_at(&self, now: i64) -> bool {
        !self.revoked && now < self.expires_at
    }
}
