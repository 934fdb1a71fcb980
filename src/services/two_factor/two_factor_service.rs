//! 2단계 인증(TOTP) 엔진
//!
//! ## 사용자별 상태
//!
//! ```text
//! disabled ──(begin_enrollment)──▶ enrolling ──(confirm_enrollment)──▶ enabled
//!     ▲                                                                  │
//!     └──────────────────────────(disable)───────────────────────────────┘
//! ```
//!
//! ## 로그인 시도별 상태 (step-up 세션)
//!
//! ```text
//! pending ──(verify_session 성공)──▶ verified
//!    │                                  │
//!    ├────────(expires_at 경과)─────────┴──▶ expired
//!    └────────(실패 MAX_SESSION_ATTEMPTS회)───▶ locked
//! ```
//!
//! 백업 코드 소비는 저장소의 조건부 `$pull` 한 번으로 이루어지므로,
//! 같은 코드의 동시 제출 중 하나만 성공합니다.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::TwoFactorConfig;
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::dto::two_factor::{SessionVerifyResponse, TwoFactorSetupResponse, TwoFactorStatusResponse};
use crate::domain::entities::two_factor::{TwoFactorSession, MAX_SESSION_ATTEMPTS};
use crate::domain::entities::users::{TwoFactorEnrollment, User};
use crate::domain::models::tenant::TenantId;
use crate::repositories::Repositories;
use crate::repositories::two_factor::TwoFactorSessionStore;
use crate::repositories::users::UserStore;
use crate::services::two_factor::totp;
use crate::utils::digest::sha256_hex;
use crate::utils::{Clock, OsRandomSource, RandomSource, SystemClock};

const BACKUP_CODE_LEN: usize = 10;
const SESSION_ID_BYTES: usize = 32;
const INVALID_CODE: &str = "유효하지 않은 인증 코드입니다";
const SESSION_LOCKED: &str = "시도 횟수를 초과한 세션입니다. 다시 로그인하세요";

#[derive(Debug, Clone)]
pub struct TwoFactorSettings {
    pub issuer: String,
    pub session_ttl_secs: i64,
    pub backup_code_count: usize,
}

impl TwoFactorSettings {
    pub fn from_env() -> Self {
        Self {
            issuer: TwoFactorConfig::issuer(),
            session_ttl_secs: TwoFactorConfig::session_ttl_minutes() * 60,
            backup_code_count: TwoFactorConfig::backup_code_count(),
        }
    }
}

/// 대소문자, 앞뒤 공백, 구분용 하이픈/공백을 무시한 백업 코드
pub fn normalize_backup_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub struct TwoFactorService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn TwoFactorSessionStore>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    settings: TwoFactorSettings,
}

static TWO_FACTOR_SERVICE_INSTANCE: OnceCell<Arc<TwoFactorService>> = OnceCell::new();

impl TwoFactorService {
    pub fn instance() -> Arc<Self> {
        TWO_FACTOR_SERVICE_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                Arc::new(Self::new(
                    repos.users.clone(),
                    repos.two_factor_sessions.clone(),
                    Arc::new(SystemClock),
                    Arc::new(OsRandomSource),
                    TwoFactorSettings::from_env(),
                ))
            })
            .clone()
    }

    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn TwoFactorSessionStore>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        settings: TwoFactorSettings,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            random,
            settings,
        }
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.settings.session_ttl_secs
    }

    async fn load_user(&self, tenant: &TenantId, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(tenant, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("사용자를 찾을 수 없습니다".to_string()))
    }

    /// 새 비밀키와 백업 코드를 만들어 등록 대기 상태로 기록합니다.
    ///
    /// 이미 활성화된 사용자는 `ConflictError`. 다시 호출하면 이전 대기 비밀키는 버려집니다.
    pub async fn begin_enrollment(&self, tenant: &TenantId, user_id: &str) -> AppResult<TwoFactorSetupResponse> {
        let user = self.load_user(tenant, user_id).await?;
        if user.has_two_factor_enabled() {
            return Err(AppError::ConflictError("이미 2단계 인증이 활성화되어 있습니다".to_string()));
        }

        let secret = totp::generate_secret(self.random.as_ref())?;
        let backup_codes = (0..self.settings.backup_code_count)
            .map(|_| self.random.random_code(BACKUP_CODE_LEN))
            .collect::<AppResult<Vec<String>>>()?;
        let hashes = backup_codes.iter().map(|c| sha256_hex(&normalize_backup_code(c))).collect();

        let (otpauth_uri, qr_image) = totp::provisioning(&secret, &self.settings.issuer, &user.email)?;

        let stored = self.users
            .begin_two_factor(tenant, user_id, TwoFactorEnrollment::pending(secret.clone(), hashes), self.clock.timestamp())
            .await?;
        if !stored {
            return Err(AppError::ConflictError("이미 2단계 인증이 활성화되어 있습니다".to_string()));
        }

        log::info!("🔐 2FA 등록 시작: tenant={}, user_id={}", tenant, user_id);

        Ok(TwoFactorSetupResponse {
            secret,
            otpauth_uri,
            qr_image,
            backup_codes,
        })
    }

    /// 후보 비밀키로 TOTP 코드를 검증한 뒤 2FA를 활성화합니다.
    pub async fn confirm_enrollment(&self, tenant: &TenantId, user_id: &str, code: &str, secret: &str) -> AppResult<()> {
        let user = self.load_user(tenant, user_id).await?;
        if user.has_two_factor_enabled() {
            return Err(AppError::ConflictError("이미 2단계 인증이 활성화되어 있습니다".to_string()));
        }

        if user.two_factor.secret.as_deref() != Some(secret) {
            return Err(AppError::ValidationError("진행 중인 2단계 인증 등록이 없습니다".to_string()));
        }

        if !totp::verify_code(secret, code, self.clock.timestamp()) {
            log::warn!("⚠️ 2FA 등록 코드 불일치: tenant={}, user_id={}", tenant, user_id);
            return Err(AppError::AuthenticationError(INVALID_CODE.to_string()));
        }

        self.users
            .activate_two_factor(tenant, user_id, secret, self.clock.timestamp())
            .await?
            .ok_or_else(|| AppError::ConflictError("2단계 인증 등록 상태가 변경되었습니다".to_string()))?;

        log::info!("✅ 2FA 활성화: tenant={}, user_id={}", tenant, user_id);
        Ok(())
    }

    /// 현재 TOTP 코드 또는 백업 코드를 검증합니다.
    ///
    /// 2FA가 비활성이면 에러 없이 `false`. 일치한 백업 코드는 즉시 소비됩니다.
    pub async fn verify_challenge(&self, tenant: &TenantId, user_id: &str, code: &str) -> AppResult<bool> {
        let user = self.load_user(tenant, user_id).await?;
        self.verify_for_user(&user, code).await
    }

    async fn verify_for_user(&self, user: &User, code: &str) -> AppResult<bool> {
        if !user.has_two_factor_enabled() {
            return Ok(false);
        }

        let now = self.clock.timestamp();

        if let Some(secret) = user.two_factor.secret.as_deref() {
            if totp::verify_code(secret, code, now) {
                return Ok(true);
            }
        }

        let normalized = normalize_backup_code(code);
        if normalized.len() != BACKUP_CODE_LEN {
            return Ok(false);
        }

        let consumed = self.users
            .consume_backup_code(&user.tenant_id, &user.id, &sha256_hex(&normalized), now)
            .await?;

        if consumed {
            log::info!("🗝️ 백업 코드 사용: tenant={}, user_id={}", user.tenant_id, user.id);
        }

        Ok(consumed)
    }

    /// 비밀번호 확인과 2FA 제출을 분리하기 위한 step-up 세션을 만듭니다.
    pub async fn create_step_up_session(&self, tenant: &TenantId, user_id: &str, client_id: &str) -> AppResult<TwoFactorSession> {
        let now = self.clock.timestamp();
        let session = TwoFactorSession {
            session_id: self.random.random_token(SESSION_ID_BYTES)?,
            tenant_id: tenant.clone(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            verified: false,
            verified_at: None,
            failed_attempts: 0,
            expires_at: now + self.settings.session_ttl_secs,
            created_at: now,
        };

        self.sessions.insert(&session).await?;
        log::info!("⏳ 2FA 세션 생성: tenant={}, user_id={}, client_id={}", tenant, user_id, client_id);

        Ok(session)
    }

    /// 세션에 대해 코드를 제출합니다.
    ///
    /// 이미 검증된 세션은 만료 전까지 코드와 관계없이 `verified=true`로 응답합니다.
    /// 실패가 한도에 이른 세션은 올바른 코드도 받지 않으며, 새 세션을 만들어야 합니다.
    pub async fn verify_session(&self, tenant: &TenantId, session_id: &str, code: &str) -> AppResult<SessionVerifyResponse> {
        let now = self.clock.timestamp();
        let session = self.sessions
            .find(tenant, session_id)
            .await?
            .filter(|s| !s.is_expired_at(now))
            .ok_or_else(|| AppError::AuthenticationError("유효하지 않거나 만료된 세션입니다".to_string()))?;

        if session.verified {
            return Ok(SessionVerifyResponse { verified: true, expires_at: session.expires_at });
        }

        if session.is_locked() {
            log::warn!("🚫 2FA 세션 시도 한도 초과: tenant={}, user_id={}", tenant, session.user_id);
            return Err(AppError::AuthenticationError(SESSION_LOCKED.to_string()));
        }

        if !self.verify_challenge(tenant, &session.user_id, code).await? {
            self.sessions.record_failure(tenant, session_id, self.clock.timestamp()).await?;
            return Ok(SessionVerifyResponse { verified: false, expires_at: session.expires_at });
        }

        if !self.sessions.mark_verified(tenant, session_id, self.clock.timestamp()).await? {
            // 동시 제출에서 진 경우: 다른 요청이 이미 검증했으면 성공으로 본다
            let verified = self.is_session_verified(tenant, session_id, &session.user_id, &session.client_id).await?;
            return Ok(SessionVerifyResponse { verified, expires_at: session.expires_at });
        }

        log::info!("✅ 2FA 세션 검증: tenant={}, user_id={}", tenant, session.user_id);
        Ok(SessionVerifyResponse { verified: true, expires_at: session.expires_at })
    }

    /// 같은 사용자/클라이언트에 발급된, 만료 전 검증 완료 세션인지 확인합니다.
    pub async fn is_session_verified(&self, tenant: &TenantId, session_id: &str, user_id: &str, client_id: &str) -> AppResult<bool> {
        let now = self.clock.timestamp();

        Ok(self.sessions
            .find(tenant, session_id)
            .await?
            .map(|s| s.user_id == user_id && s.client_id == client_id && s.is_verified_at(now))
            .unwrap_or(false))
    }

    /// 유효한 코드 확인 후 비밀키와 백업 코드를 모두 삭제합니다. 되돌릴 수 없습니다.
    pub async fn disable(&self, tenant: &TenantId, user_id: &str, code: &str) -> AppResult<()> {
        let user = self.load_user(tenant, user_id).await?;
        if !user.has_two_factor_enabled() {
            return Err(AppError::ValidationError("2단계 인증이 활성화되어 있지 않습니다".to_string()));
        }

        if !self.verify_for_user(&user, code).await? {
            return Err(AppError::AuthenticationError(INVALID_CODE.to_string()));
        }

        self.users.clear_two_factor(tenant, user_id, self.clock.timestamp()).await?;
        log::info!("🔓 2FA 비활성화: tenant={}, user_id={}", tenant, user_id);

        Ok(())
    }

    pub async fn status(&self, tenant: &TenantId, user_id: &str) -> AppResult<TwoFactorStatusResponse> {
        let user = self.load_user(tenant, user_id).await?;
        let enabled = user.has_two_factor_enabled();

        Ok(TwoFactorStatusResponse {
            enabled,
            backup_codes_remaining: if enabled { user.two_factor.backup_codes.len() } else { 0 },
        })
    }
}

fn two_factor_service_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(TwoFactorService::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "two_factor_service",
        constructor: two_factor_service_constructor,
    }
}
