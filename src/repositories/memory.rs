//! 인메모리 저장소 구현
//!
//! `STORAGE_BACKEND=memory`로 로컬 실행할 때와 단위 테스트에서 사용합니다.
//! 각 조건부 연산은 하나의 `Mutex` 임계 구역 안에서 검사와 변경을 수행하므로
//! MongoDB 구현과 같은 원자성을 가집니다.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::errors::{AppError, AppResult};
use crate::domain::entities::oauth::{AuthorizationCode, OAuthClient, RefreshToken};
use crate::domain::entities::two_factor::TwoFactorSession;
use crate::domain::entities::users::{TwoFactorEnrollment, User};
use crate::domain::models::social::PendingSocialLogin;
use crate::domain::models::tenant::TenantId;
use crate::repositories::clients::ClientStore;
use crate::repositories::codes::AuthorizationCodeStore;
use crate::repositories::social::SocialStateStore;
use crate::repositories::tokens::RefreshTokenStore;
use crate::repositories::two_factor::TwoFactorSessionStore;
use crate::repositories::users::UserStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, tenant: &TenantId, user_id: &str) -> AppResult<Option<User>> {
        Ok(lock(&self.users)
            .get(user_id)
            .filter(|u| &u.tenant_id == tenant)
            .cloned())
    }

    async fn find_by_email(&self, tenant: &TenantId, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();

        Ok(lock(&self.users)
            .values()
            .find(|u| &u.tenant_id == tenant && u.email == email)
            .cloned())
    }

    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = lock(&self.users);

        if users.values().any(|u| u.tenant_id == user.tenant_id && u.email == user.email) {
            return Err(AppError::ConflictError("이미 사용 중인 이메일입니다".to_string()));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn begin_two_factor(&self, tenant: &TenantId, user_id: &str, enrollment: TwoFactorEnrollment, now: i64) -> AppResult<bool> {
        let mut users = lock(&self.users);

        match users.get_mut(user_id).filter(|u| &u.tenant_id == tenant && !u.two_factor.enabled) {
            Some(user) => {
                user.two_factor = enrollment;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn activate_two_factor(&self, tenant: &TenantId, user_id: &str, secret: &str, now: i64) -> AppResult<Option<User>> {
        let mut users = lock(&self.users);

        let user = users.get_mut(user_id).filter(|u| {
            &u.tenant_id == tenant && !u.two_factor.enabled && u.two_factor.secret.as_deref() == Some(secret)
        });

        Ok(user.map(|user| {
            user.two_factor.enabled = true;
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn consume_backup_code(&self, tenant: &TenantId, user_id: &str, code_hash: &str, now: i64) -> AppResult<bool> {
        let mut users = lock(&self.users);

        let Some(user) = users.get_mut(user_id).filter(|u| &u.tenant_id == tenant && u.two_factor.enabled) else {
            return Ok(false);
        };

        match user.two_factor.backup_codes.iter().position(|h| h == code_hash) {
            Some(index) => {
                user.two_factor.backup_codes.remove(index);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_two_factor(&self, tenant: &TenantId, user_id: &str, now: i64) -> AppResult<bool> {
        let mut users = lock(&self.users);

        match users.get_mut(user_id).filter(|u| &u.tenant_id == tenant) {
            Some(user) => {
                user.two_factor = TwoFactorEnrollment::default();
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryClientStore {
    clients: Mutex<Vec<OAuthClient>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn find_by_client_id(&self, tenant: &TenantId, client_id: &str) -> AppResult<Option<OAuthClient>> {
        Ok(lock(&self.clients)
            .iter()
            .find(|c| &c.tenant_id == tenant && c.client_id == client_id)
            .cloned())
    }

    async fn insert(&self, client: OAuthClient) -> AppResult<()> {
        lock(&self.clients).push(client);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAuthorizationCodeStore {
    codes: Mutex<HashMap<String, AuthorizationCode>>,
}

impl InMemoryAuthorizationCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryAuthorizationCodeStore {
    async fn insert(&self, code: &AuthorizationCode) -> AppResult<()> {
        lock(&self.codes).insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(
        &self,
        tenant: &TenantId,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: i64,
    ) -> AppResult<Option<AuthorizationCode>> {
        let mut codes = lock(&self.codes);

        let Some(stored) = codes.get_mut(code) else {
            return Ok(None);
        };

        let redeemable = &stored.tenant_id == tenant
            && stored.client_id == client_id
            && stored.redirect_uri == redirect_uri
            && !stored.used
            && !stored.is_expired_at(now);

        if !redeemable {
            return Ok(None);
        }

        stored.used = true;
        stored.used_at = Some(now);
        Ok(Some(stored.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, token: &RefreshToken) -> AppResult<()> {
        lock(&self.tokens).insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find(&self, tenant: &TenantId, token_hash: &str) -> AppResult<Option<RefreshToken>> {
        Ok(lock(&self.tokens)
            .get(token_hash)
            .filter(|t| &t.tenant_id == tenant)
            .cloned())
    }

    async fn revoke(&self, tenant: &TenantId, token_hash: &str, now: i64) -> AppResult<bool> {
        let mut tokens = lock(&self.tokens);

        match tokens.get_mut(token_hash).filter(|t| &t.tenant_id == tenant && !t.revoked) {
            Some(token) => {
                token.revoked = true;
                token.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryTwoFactorSessionStore {
    sessions: Mutex<HashMap<String, TwoFactorSession>>,
}

impl InMemoryTwoFactorSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TwoFactorSessionStore for InMemoryTwoFactorSessionStore {
    async fn insert(&self, session: &TwoFactorSession) -> AppResult<()> {
        lock(&self.sessions).insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, tenant: &TenantId, session_id: &str) -> AppResult<Option<TwoFactorSession>> {
        Ok(lock(&self.sessions)
            .get(session_id)
            .filter(|s| &s.tenant_id == tenant)
            .cloned())
    }

    async fn mark_verified(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool> {
        let mut sessions = lock(&self.sessions);

        match sessions
            .get_mut(session_id)
            .filter(|s| &s.tenant_id == tenant && !s.verified && !s.is_locked() && !s.is_expired_at(now))
        {
            Some(session) => {
                session.verified = true;
                session.verified_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_failure(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool> {
        let mut sessions = lock(&self.sessions);

        match sessions
            .get_mut(session_id)
            .filter(|s| &s.tenant_id == tenant && !s.verified && !s.is_locked() && !s.is_expired_at(now))
        {
            Some(session) => {
                session.failed_attempts += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemorySocialStateStore {
    entries: Mutex<HashMap<String, PendingSocialLogin>>,
}

impl InMemorySocialStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SocialStateStore for InMemorySocialStateStore {
    async fn put(&self, state: &str, entry: &PendingSocialLogin) -> AppResult<()> {
        lock(&self.entries).insert(state.to_string(), entry.clone());
        Ok(())
    }

    async fn take(&self, state: &str, now: i64) -> AppResult<Option<PendingSocialLogin>> {
        Ok(lock(&self.entries)
            .remove(state)
            .filter(|e| !e.is_expired_at(now)))
    }
}
