//! 사용자 엔티티
//!
//! MongoDB `users` 컬렉션 문서와 1:1로 매핑됩니다. 이메일은 테넌트 안에서만 유일하며,
//! 같은 이메일이 다른 테넌트에 별도 사용자로 존재할 수 있습니다.

use serde::{Deserialize, Serialize};

use crate::config::AuthProvider;
use crate::domain::models::social::ExternalProfile;
use crate::domain::models::tenant::TenantId;

/// 소셜 로그인으로 생성된 사용자의 기본 스코프
pub const SOCIAL_DEFAULT_SCOPES: [&str; 4] = ["read", "openid", "profile", "email"];

/// 모든 소셜 로그인 사용자가 속하는 그룹
pub const SOCIAL_USERS_GROUP: &str = "social-users";

/// 사용자 레코드에 내장되는 2단계 인증 상태
///
/// `enabled=false`이면서 `secret`이 있으면 등록 진행 중(enrolling) 상태입니다.
/// 백업 코드는 정규화한 코드의 SHA-256 hex로만 저장합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwoFactorEnrollment {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub backup_codes: Vec<String>,
}

impl TwoFactorEnrollment {
    pub fn pending(secret: String, backup_code_hashes: Vec<String>) -> Self {
        Self {
            enabled: false,
            secret: Some(secret),
            backup_codes: backup_code_hashes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub tenant_id: TenantId,

    pub email: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    /// 소셜 로그인 사용자는 비밀번호가 없다
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password_hash: Option<String>,

    pub auth_provider: AuthProvider,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub two_factor: TwoFactorEnrollment,

    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn new_local(
        tenant_id: TenantId,
        email: String,
        password_hash: String,
        scopes: Vec<String>,
        groups: Vec<String>,
        now: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            email: email.trim().to_lowercase(),
            first_name: None,
            last_name: None,
            password_hash: Some(password_hash),
            auth_provider: AuthProvider::Local,
            external_id: None,
            scopes,
            groups,
            two_factor: TwoFactorEnrollment::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// 외부 제공자 프로필로 새 사용자를 만듭니다. 비밀번호 없이
    /// 기본 스코프와 `social-users`, `{provider}-users` 그룹을 부여합니다.
    pub fn new_social(tenant_id: TenantId, provider: AuthProvider, email: String, profile: &ExternalProfile, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            email: email.trim().to_lowercase(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            password_hash: None,
            auth_provider: provider,
            external_id: Some(profile.external_id.clone()),
            scopes: SOCIAL_DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            groups: vec![
                SOCIAL_USERS_GROUP.to_string(),
                format!("{}-users", provider.as_str()),
            ],
            two_factor: TwoFactorEnrollment::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_two_factor_enabled(&self) -> bool {
        self.two_factor.enabled
    }
}
