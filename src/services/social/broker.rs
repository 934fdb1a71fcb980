//! 소셜 로그인 브로커
//!
//! ```text
//! begin_federated_login
//!   └─ state 발급 ─ SocialStateStore::put(state, {provider, tenant, original?}) ─ 제공자 인가 URL
//!
//! handle_callback
//!   ├─ SocialStateStore::take(state)       (없음/만료/불일치 → 외부 호출 없이 거부)
//!   ├─ SocialProvider::exchange_code
//!   ├─ SocialProvider::fetch_profile
//!   ├─ UserService::resolve_social_user
//!   └─ original 있음 → 원래 client/redirect/PKCE에 묶인 코드로 리다이렉트
//!      original 없음 → direct-login 코드 + nonce, /auth/callback으로 리다이렉트
//! ```

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use validator::Validate;

use crate::config::{AuthProvider, IssuerConfig, SocialConfig};
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::dto::oauth::AuthorizeParams;
use crate::domain::dto::social::SocialCallbackQuery;
use crate::domain::entities::oauth::{CodeChallengeMethod, DIRECT_LOGIN_CLIENT_ID};
use crate::domain::entities::users::SOCIAL_DEFAULT_SCOPES;
use crate::domain::models::social::{OriginalAuthRequest, PendingSocialLogin};
use crate::domain::models::tenant::TenantId;
use crate::repositories::Repositories;
use crate::repositories::social::SocialStateStore;
use crate::services::oauth::{build_code_redirect, narrow_scopes, AuthorizationCodeService, IssueCodeRequest, OAuthService};
use crate::services::social::provider::{ConfiguredProviders, ProviderDirectory};
use crate::services::users::UserService;
use crate::utils::digest::sha256_hex;
use crate::utils::string_utils::parse_scopes;
use crate::utils::{Clock, OsRandomSource, RandomSource, SystemClock};

const STATE_BYTES: usize = 32;
const NONCE_BYTES: usize = 32;

/// 직접 로그인 nonce를 전달하는 쿠키 이름
pub const DIRECT_LOGIN_NONCE_COOKIE: &str = "direct_login_nonce";

const INVALID_STATE: &str = "유효하지 않은 로그인 요청입니다";

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub state_ttl_secs: i64,
    pub issuer_base: String,
}

impl BrokerSettings {
    pub fn from_env() -> Self {
        Self {
            state_ttl_secs: SocialConfig::state_ttl_minutes() * 60,
            issuer_base: IssuerConfig::base_url(),
        }
    }
}

/// 콜백 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SocialLoginResult {
    /// 원래 OAuth2 요청의 redirect_uri로 코드와 함께 돌아간다
    Redirect(String),
    /// 시스템 콜백 페이지로 돌아가며, `nonce`는 쿠키로 내려보낸다
    DirectLogin { redirect_url: String, nonce: String },
}

pub struct SocialLoginBroker {
    providers: Arc<dyn ProviderDirectory>,
    states: Arc<dyn SocialStateStore>,
    users: Arc<UserService>,
    codes: Arc<AuthorizationCodeService>,
    oauth: Arc<OAuthService>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    settings: BrokerSettings,
}

static SOCIAL_LOGIN_BROKER_INSTANCE: OnceCell<Arc<SocialLoginBroker>> = OnceCell::new();

impl SocialLoginBroker {
    pub fn instance() -> Arc<Self> {
        SOCIAL_LOGIN_BROKER_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                let providers: Arc<dyn ProviderDirectory> = match ConfiguredProviders::new() {
                    Ok(providers) => Arc::new(providers),
                    Err(e) => {
                        log::error!("❌ 소셜 제공자 HTTP 클라이언트 생성 실패: {}", e);
                        Arc::new(UnavailableProviders)
                    }
                };

                Arc::new(Self::new(
                    providers,
                    repos.social_states.clone(),
                    UserService::instance(),
                    AuthorizationCodeService::instance(),
                    OAuthService::instance(),
                    Arc::new(SystemClock),
                    Arc::new(OsRandomSource),
                    BrokerSettings::from_env(),
                ))
            })
            .clone()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        providers: Arc<dyn ProviderDirectory>,
        states: Arc<dyn SocialStateStore>,
        users: Arc<UserService>,
        codes: Arc<AuthorizationCodeService>,
        oauth: Arc<OAuthService>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            providers,
            states,
            users,
            codes,
            oauth,
            clock,
            random,
            settings,
        }
    }

    /// 직접 로그인 코드가 바인딩되는 시스템 콜백 페이지 주소
    pub fn direct_login_redirect_uri(&self, tenant: &TenantId) -> String {
        format!("{}{}/auth/callback", self.settings.issuer_base, tenant.path_prefix())
    }

    /// `/auth/{provider}/oauth` 쿼리를 왕복 동안 보존할 원래 요청으로 변환합니다.
    pub fn original_from_params(params: &AuthorizeParams) -> AppResult<OriginalAuthRequest> {
        params.validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        if let Some(response_type) = params.response_type.as_deref() {
            if response_type != "code" {
                return Err(AppError::ValidationError("response_type은 code여야 합니다".to_string()));
            }
        }

        let code_challenge_method = match &params.code_challenge {
            Some(_) => Some(CodeChallengeMethod::parse(params.code_challenge_method.as_deref())?),
            None => None,
        };

        Ok(OriginalAuthRequest {
            client_id: params.client_id.clone(),
            redirect_uri: params.redirect_uri.clone(),
            original_state: params.state.clone(),
            scope: params.scope.clone(),
            code_challenge: params.code_challenge.clone(),
            code_challenge_method,
        })
    }

    /// state를 발급·저장하고 제공자 인가 URL을 반환합니다.
    pub async fn begin_federated_login(
        &self,
        kind: AuthProvider,
        tenant: &TenantId,
        original: Option<OriginalAuthRequest>,
    ) -> AppResult<String> {
        // 설정 누락은 사용자를 제공자로 보내기 전에 드러나야 한다
        let provider = self.providers.provider(kind)?;

        if let Some(original) = &original {
            self.oauth
                .validate_client_redirect(tenant, &original.client_id, &original.redirect_uri)
                .await?;
        }

        let state = self.random.random_token(STATE_BYTES)?;
        let auth_url = provider.auth_url(&state)?;

        let now = self.clock.timestamp();
        let entry = PendingSocialLogin {
            provider: kind,
            tenant_id: tenant.clone(),
            original,
            created_at: now,
            expires_at: now + self.settings.state_ttl_secs,
        };
        self.states.put(&state, &entry).await?;

        log::info!(
            "🌐 소셜 로그인 시작: tenant={}, provider={}, with_context={}",
            tenant,
            kind.as_str(),
            entry.original.is_some()
        );

        Ok(auth_url)
    }

    /// 제공자 콜백을 처리하고 다음 리다이렉트를 결정합니다.
    ///
    /// state는 외부 호출 전에 꺼내지며, 이후 단계가 실패해도 재사용되지 않습니다.
    pub async fn handle_callback(
        &self,
        kind: AuthProvider,
        tenant: &TenantId,
        query: &SocialCallbackQuery,
    ) -> AppResult<SocialLoginResult> {
        let state = query.state
            .as_deref()
            .ok_or_else(|| AppError::AuthenticationError(INVALID_STATE.to_string()))?;

        let pending = self.states
            .take(state, self.clock.timestamp())
            .await?
            .ok_or_else(|| {
                log::warn!("⚠️ 알 수 없거나 만료된 state: tenant={}, provider={}", tenant, kind.as_str());
                AppError::AuthenticationError(INVALID_STATE.to_string())
            })?;

        if pending.provider != kind || &pending.tenant_id != tenant {
            log::warn!(
                "🚨 state 불일치 (CSRF 의심): expected={}/{}, got={}/{}",
                pending.tenant_id,
                pending.provider.as_str(),
                tenant,
                kind.as_str()
            );
            return Err(AppError::AuthenticationError(INVALID_STATE.to_string()));
        }

        if let Some(error) = &query.error {
            log::warn!(
                "⚠️ 제공자가 로그인을 거부: provider={}, error={}, description={:?}",
                kind.as_str(),
                error,
                query.error_description
            );
            return Err(AppError::AuthenticationError("소셜 로그인이 취소되었습니다".to_string()));
        }

        let code = query.code
            .as_deref()
            .ok_or_else(|| AppError::ValidationError("code가 필요합니다".to_string()))?;

        let provider = self.providers.provider(kind)?;
        let external_token = provider.exchange_code(code).await?;
        let profile = provider.fetch_profile(&external_token).await?;
        let user = self.users.resolve_social_user(tenant, kind, &profile).await?;

        if user.has_two_factor_enabled() {
            log::info!("🔐 제공자 인증으로 로컬 2FA 생략: tenant={}, provider={}", tenant, kind.as_str());
        }

        match pending.original {
            Some(original) => {
                self.oauth
                    .validate_client_redirect(tenant, &original.client_id, &original.redirect_uri)
                    .await?;

                let scopes = narrow_scopes(&parse_scopes(original.scope.as_deref()), &user.scopes);
                let code = self.codes
                    .issue_code(IssueCodeRequest {
                        tenant_id: tenant.clone(),
                        client_id: original.client_id.clone(),
                        user_id: user.id.clone(),
                        redirect_uri: original.redirect_uri.clone(),
                        scopes,
                        code_challenge: original.code_challenge.clone(),
                        code_challenge_method: original.code_challenge_method,
                        direct_login_nonce_hash: None,
                    })
                    .await?;

                log::info!("✅ 소셜 로그인 후 OAuth2 흐름 재개: tenant={}, client_id={}", tenant, original.client_id);

                Ok(SocialLoginResult::Redirect(build_code_redirect(
                    &original.redirect_uri,
                    &code,
                    original.original_state.as_deref(),
                )?))
            }
            None => {
                let nonce = self.random.random_token(NONCE_BYTES)?;
                let redirect_uri = self.direct_login_redirect_uri(tenant);
                let requested: Vec<String> = SOCIAL_DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect();

                let code = self.codes
                    .issue_code(IssueCodeRequest {
                        tenant_id: tenant.clone(),
                        client_id: DIRECT_LOGIN_CLIENT_ID.to_string(),
                        user_id: user.id.clone(),
                        redirect_uri: redirect_uri.clone(),
                        scopes: narrow_scopes(&requested, &user.scopes),
                        code_challenge: None,
                        code_challenge_method: None,
                        direct_login_nonce_hash: Some(sha256_hex(&nonce)),
                    })
                    .await?;

                log::info!("✅ 소셜 직접 로그인: tenant={}, provider={}", tenant, kind.as_str());

                Ok(SocialLoginResult::DirectLogin {
                    redirect_url: build_code_redirect(&redirect_uri, &code, None)?,
                    nonce,
                })
            }
        }
    }
}

/// HTTP 클라이언트를 만들 수 없을 때 모든 제공자를 설정 오류로 응답하는 디렉터리
struct UnavailableProviders;

impl ProviderDirectory for UnavailableProviders {
    fn provider(&self, kind: AuthProvider) -> AppResult<Arc<dyn crate::services::social::SocialProvider>> {
        Err(AppError::ConfigurationError(format!("{} 로그인을 사용할 수 없습니다", kind.as_str())))
    }
}

fn social_login_broker_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(SocialLoginBroker::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "social_login_broker",
        constructor: social_login_broker_constructor,
    }
}
