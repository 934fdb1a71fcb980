//! 사용자 조회, 비밀번호 인증, 소셜 사용자 해석 서비스
//!
//! 사용자 관리 CRUD는 이 서버의 범위 밖이며, 여기서는 인가 흐름이 필요로 하는
//! 조회와 인증만 제공합니다. 로컬 사용자 생성([`UserService::create_local_user`])은
//! 초기 데이터 적재와 테스트에서 사용됩니다.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::{AuthProvider, PasswordConfig};
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::entities::users::User;
use crate::domain::models::social::ExternalProfile;
use crate::domain::models::tenant::TenantId;
use crate::repositories::Repositories;
use crate::repositories::users::UserStore;
use crate::utils::{Clock, SystemClock};

/// 사용자 존재 여부와 실패 요인을 드러내지 않는 공통 메시지
const INVALID_CREDENTIALS: &str = "잘못된 이메일 또는 비밀번호입니다";

pub struct UserService {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

static USER_SERVICE_INSTANCE: OnceCell<Arc<UserService>> = OnceCell::new();

impl UserService {
    pub fn instance() -> Arc<Self> {
        USER_SERVICE_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                Arc::new(Self::new(repos.users.clone(), Arc::new(SystemClock)))
            })
            .clone()
    }

    pub fn new(users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn create_local_user(
        &self,
        tenant: &TenantId,
        email: &str,
        password: &str,
        scopes: Vec<String>,
        groups: Vec<String>,
    ) -> AppResult<User> {
        let password_hash = bcrypt::hash(password, PasswordConfig::bcrypt_cost())
            .map_err(|e| AppError::InternalError(format!("비밀번호 해싱 실패: {}", e)))?;

        let user = User::new_local(
            tenant.clone(),
            email.to_string(),
            password_hash,
            scopes,
            groups,
            self.clock.timestamp(),
        );

        self.users.create(user).await
    }

    pub async fn find_by_id(&self, tenant: &TenantId, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(tenant, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("사용자를 찾을 수 없습니다".to_string()))
    }

    /// 이메일/비밀번호로 테넌트 안의 사용자를 인증합니다.
    ///
    /// 사용자 없음, 소셜 계정, 비밀번호 불일치, 비활성 계정은 모두 같은 에러입니다.
    pub async fn authenticate_password(&self, tenant: &TenantId, email: &str, password: &str) -> AppResult<User> {
        let start_time = std::time::Instant::now();

        let user = self.users
            .find_by_email(tenant, email)
            .await?
            .ok_or_else(|| AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let password_hash = user.password_hash
            .as_deref()
            .ok_or_else(|| AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let is_valid = bcrypt::verify(password, password_hash)
            .map_err(|e| AppError::InternalError(format!("비밀번호 검증 실패: {}", e)))?;

        log::debug!("Password verification took: {:?}", start_time.elapsed());

        if !is_valid || !user.is_active {
            log::warn!("⚠️ 비밀번호 로그인 실패: tenant={}", tenant);
            return Err(AppError::AuthenticationError(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// 외부 프로필을 내부 사용자로 해석합니다.
    ///
    /// 같은 테넌트에 같은 이메일이 있으면 그대로 재사용하고(프로필 병합 없음),
    /// 없으면 비밀번호 없는 소셜 사용자를 새로 만듭니다.
    pub async fn resolve_social_user(
        &self,
        tenant: &TenantId,
        provider: AuthProvider,
        profile: &ExternalProfile,
    ) -> AppResult<User> {
        let email = profile.email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::ExternalServiceError(format!("{} 프로필에 이메일이 없습니다", provider.as_str())))?;

        if let Some(existing) = self.users.find_by_email(tenant, email).await? {
            if !existing.is_active {
                return Err(AppError::AuthenticationError("비활성화된 계정입니다".to_string()));
            }
            log::info!("👤 기존 사용자로 소셜 로그인: tenant={}, provider={}", tenant, provider.as_str());
            return Ok(existing);
        }

        let user = User::new_social(tenant.clone(), provider, email.to_string(), profile, self.clock.timestamp());

        match self.users.create(user).await {
            Ok(created) => {
                log::info!("🆕 소셜 사용자 생성: tenant={}, provider={}", tenant, provider.as_str());
                Ok(created)
            }
            // 같은 이메일로 동시에 첫 로그인한 경우 먼저 생성된 사용자를 쓴다
            Err(AppError::ConflictError(_)) => self.users
                .find_by_email(tenant, email)
                .await?
                .ok_or_else(|| AppError::InternalError("소셜 사용자 생성 충돌 후 조회 실패".to_string())),
            Err(e) => Err(e),
        }
    }
}

fn user_service_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(UserService::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "user_service",
        constructor: user_service_constructor,
    }
}
