//! 인가 코드 발급/상환 서비스
//!
//! ## 수명 주기
//!
//! ```text
//! IssueCode ──▶ used=false ──(RedeemCode: CAS)──▶ used=true (영구 무효)
//!                    │
//!                    └──(expires_at 경과)──▶ 상환 불가
//! ```
//!
//! 상환은 저장소의 [`AuthorizationCodeStore::consume`] 한 번으로 이루어지며,
//! 동시에 들어온 두 상환 요청 중 정확히 하나만 성공합니다.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::AuthCodeConfig;
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::entities::oauth::{AuthorizationCode, CodeChallengeMethod};
use crate::domain::models::tenant::TenantId;
use crate::repositories::Repositories;
use crate::repositories::codes::AuthorizationCodeStore;
use crate::utils::{Clock, OsRandomSource, RandomSource, SystemClock};

/// 교집합이 비었을 때 부여하는 최소 스코프
pub const MINIMAL_DEFAULT_SCOPE: &str = "read";

const CODE_BYTES: usize = 32;

/// 코드 발급 입력
#[derive(Debug, Clone)]
pub struct IssueCodeRequest {
    pub tenant_id: TenantId,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<CodeChallengeMethod>,
    pub direct_login_nonce_hash: Option<String>,
}

/// 요청 스코프를 사용자가 실제로 가진 스코프로 좁힌다.
///
/// 요청 순서를 유지하며, 교집합이 비면 실패 대신 `["read"]`를 부여한다.
pub fn narrow_scopes(requested: &[String], user_scopes: &[String]) -> Vec<String> {
    let granted: Vec<String> = requested
        .iter()
        .filter(|scope| user_scopes.contains(scope))
        .cloned()
        .collect();

    if granted.is_empty() {
        vec![MINIMAL_DEFAULT_SCOPE.to_string()]
    } else {
        granted
    }
}

pub struct AuthorizationCodeService {
    codes: Arc<dyn AuthorizationCodeStore>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    ttl_secs: i64,
}

static AUTHORIZATION_CODE_SERVICE_INSTANCE: OnceCell<Arc<AuthorizationCodeService>> = OnceCell::new();

impl AuthorizationCodeService {
    pub fn instance() -> Arc<Self> {
        AUTHORIZATION_CODE_SERVICE_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                Arc::new(Self::new(
                    repos.codes.clone(),
                    Arc::new(SystemClock),
                    Arc::new(OsRandomSource),
                    AuthCodeConfig::ttl_minutes() * 60,
                ))
            })
            .clone()
    }

    pub fn new(
        codes: Arc<dyn AuthorizationCodeStore>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            codes,
            clock,
            random,
            ttl_secs,
        }
    }

    /// 새 단일 사용 코드를 발급하고 저장합니다.
    ///
    /// 난수 소스가 실패하면 `EntropyError`로 중단합니다.
    pub async fn issue_code(&self, request: IssueCodeRequest) -> AppResult<String> {
        let code = self.random.random_token(CODE_BYTES)?;
        let now = self.clock.timestamp();

        let record = AuthorizationCode {
            code: code.clone(),
            tenant_id: request.tenant_id,
            client_id: request.client_id,
            user_id: request.user_id,
            redirect_uri: request.redirect_uri,
            scopes: request.scopes,
            code_challenge_method: request
                .code_challenge
                .as_ref()
                .map(|_| request.code_challenge_method.unwrap_or(CodeChallengeMethod::Plain)),
            code_challenge: request.code_challenge,
            direct_login_nonce_hash: request.direct_login_nonce_hash,
            expires_at: now + self.ttl_secs,
            used: false,
            used_at: None,
            created_at: now,
        };

        self.codes.insert(&record).await?;

        log::info!(
            "🎫 인가 코드 발급: tenant={}, client_id={}, user_id={}, scopes={:?}",
            record.tenant_id, record.client_id, record.user_id, record.scopes
        );

        Ok(code)
    }

    /// 코드를 원자적으로 상환합니다.
    ///
    /// 존재하지 않음, 이미 사용됨, 만료, client_id/redirect_uri 불일치는
    /// 모두 같은 `InvalidGrant`로 응답합니다.
    pub async fn redeem_code(
        &self,
        tenant: &TenantId,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> AppResult<AuthorizationCode> {
        let now = self.clock.timestamp();

        match self.codes.consume(tenant, code, client_id, redirect_uri, now).await? {
            Some(record) => {
                log::info!("✅ 인가 코드 상환: tenant={}, client_id={}", tenant, client_id);
                Ok(record)
            }
            None => {
                log::warn!("⚠️ 인가 코드 상환 거부: tenant={}, client_id={}", tenant, client_id);
                Err(AppError::InvalidGrant("유효하지 않은 인가 코드입니다".to_string()))
            }
        }
    }
}

fn authorization_code_service_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(AuthorizationCodeService::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "authorization_code_service",
        constructor: authorization_code_service_constructor,
    }
}
