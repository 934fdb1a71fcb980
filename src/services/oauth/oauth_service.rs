//! OAuth2 인가 서버 흐름 조합
//!
//! authorize 단계(클라이언트/리다이렉트 검증, 비밀번호 로그인, 2FA 게이트, 코드 발급)와
//! token 단계(코드 상환 + PKCE/클라이언트 증명, 리프레시 토큰 회전), 폐기, userinfo를
//! 하위 서비스들로 조합합니다.
//!
//! ```text
//! POST /oauth/authorize
//!   ├─ validate_authorize  (client, redirect_uri 정확히 일치, response_type=code)
//!   ├─ UserService::authenticate_password
//!   ├─ 2FA 활성 사용자
//!   │    ├─ totp_code            → TwoFactorService::verify_challenge
//!   │    ├─ two_factor_session_id → TwoFactorService::is_session_verified
//!   │    └─ 둘 다 없음            → step-up 세션 생성, TwoFactorRequired
//!   └─ narrow_scopes → AuthorizationCodeService::issue_code → 302
//! ```

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use reqwest::Url;
use serde_json::json;
use validator::Validate;

use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::dto::oauth::{AuthorizeParams, RevokeRequest, TokenRequest};
use crate::domain::entities::oauth::{CodeChallengeMethod, OAuthClient, DIRECT_LOGIN_CLIENT_ID};
use crate::domain::entities::users::User;
use crate::domain::models::auth::AuthenticatedUser;
use crate::domain::models::tenant::TenantId;
use crate::domain::models::token::{TokenResponse, TokenSubject};
use crate::repositories::Repositories;
use crate::repositories::clients::ClientStore;
use crate::services::auth::TokenService;
use crate::services::oauth::authorization_code_service::{narrow_scopes, AuthorizationCodeService, IssueCodeRequest};
use crate::services::oauth::pkce::authenticate_redemption;
use crate::services::two_factor::TwoFactorService;
use crate::services::users::UserService;
use crate::utils::string_utils::parse_scopes;

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
const RESPONSE_TYPE_CODE: &str = "code";

/// 검증을 통과한 authorize 요청
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub client: OAuthClient,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<CodeChallengeMethod>,
}

/// 로그인 폼에서 받은 자격 증명
#[derive(Debug, Clone)]
pub struct PasswordLogin {
    pub email: String,
    pub password: String,
    pub totp_code: Option<String>,
    pub two_factor_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizeOutcome {
    /// `redirect_uri?code=...&state=...`
    Redirect(String),
    TwoFactorRequired { session_id: String, expires_in: i64 },
}

/// 클라이언트 redirect URI에 `code`와 (있으면) `state`를 붙인다.
pub fn build_code_redirect(redirect_uri: &str, code: &str, state: Option<&str>) -> AppResult<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|_| AppError::ValidationError("redirect_uri 형식이 올바르지 않습니다".to_string()))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("code", code);
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }

    Ok(url.to_string())
}

pub fn token_subject(user: &User, client_id: &str, scopes: Vec<String>) -> TokenSubject {
    TokenSubject {
        tenant_id: user.tenant_id.clone(),
        user_id: user.id.clone(),
        client_id: client_id.to_string(),
        scopes,
        groups: user.groups.clone(),
        email: Some(user.email.clone()),
        given_name: user.first_name.clone(),
        family_name: user.last_name.clone(),
    }
}

pub struct OAuthService {
    clients: Arc<dyn ClientStore>,
    users: Arc<UserService>,
    codes: Arc<AuthorizationCodeService>,
    tokens: Arc<TokenService>,
    two_factor: Arc<TwoFactorService>,
}

static OAUTH_SERVICE_INSTANCE: OnceCell<Arc<OAuthService>> = OnceCell::new();

impl OAuthService {
    pub fn instance() -> Arc<Self> {
        OAUTH_SERVICE_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                Arc::new(Self::new(
                    repos.clients.clone(),
                    UserService::instance(),
                    AuthorizationCodeService::instance(),
                    TokenService::instance(),
                    TwoFactorService::instance(),
                ))
            })
            .clone()
    }

    pub fn new(
        clients: Arc<dyn ClientStore>,
        users: Arc<UserService>,
        codes: Arc<AuthorizationCodeService>,
        tokens: Arc<TokenService>,
        two_factor: Arc<TwoFactorService>,
    ) -> Self {
        Self {
            clients,
            users,
            codes,
            tokens,
            two_factor,
        }
    }

    /// 테넌트의 활성 클라이언트를 찾고 redirect URI가 등록값과 정확히 같은지 확인합니다.
    pub async fn validate_client_redirect(&self, tenant: &TenantId, client_id: &str, redirect_uri: &str) -> AppResult<OAuthClient> {
        let client = self.find_active_client(tenant, client_id).await?;

        if !client.is_redirect_uri_registered(redirect_uri) {
            log::warn!("⚠️ 등록되지 않은 redirect_uri: tenant={}, client_id={}", tenant, client_id);
            return Err(AppError::ValidationError("등록되지 않은 redirect_uri입니다".to_string()));
        }

        Ok(client)
    }

    async fn find_active_client(&self, tenant: &TenantId, client_id: &str) -> AppResult<OAuthClient> {
        self.clients
            .find_by_client_id(tenant, client_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::InvalidClient("알 수 없는 클라이언트입니다".to_string()))
    }

    pub async fn validate_authorize(&self, tenant: &TenantId, params: &AuthorizeParams) -> AppResult<AuthorizeRequest> {
        params.validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        if params.response_type.as_deref() != Some(RESPONSE_TYPE_CODE) {
            return Err(AppError::ValidationError("response_type은 code여야 합니다".to_string()));
        }

        let client = self.validate_client_redirect(tenant, &params.client_id, &params.redirect_uri).await?;

        let code_challenge_method = match &params.code_challenge {
            Some(_) => Some(CodeChallengeMethod::parse(params.code_challenge_method.as_deref())?),
            None => None,
        };

        Ok(AuthorizeRequest {
            client,
            redirect_uri: params.redirect_uri.clone(),
            scopes: parse_scopes(params.scope.as_deref()),
            state: params.state.clone(),
            code_challenge: params.code_challenge.clone(),
            code_challenge_method,
        })
    }

    /// 비밀번호 로그인과 2FA 게이트를 거쳐 인가 코드를 발급합니다.
    pub async fn authorize(&self, tenant: &TenantId, request: &AuthorizeRequest, login: PasswordLogin) -> AppResult<AuthorizeOutcome> {
        let user = self.users.authenticate_password(tenant, &login.email, &login.password).await?;
        let client_id = request.client.client_id.as_str();

        if user.has_two_factor_enabled() {
            let passed = match (&login.totp_code, &login.two_factor_session_id) {
                (Some(code), _) => self.two_factor.verify_challenge(tenant, &user.id, code).await?,
                (None, Some(session_id)) => {
                    self.two_factor.is_session_verified(tenant, session_id, &user.id, client_id).await?
                }
                (None, None) => {
                    let session = self.two_factor.create_step_up_session(tenant, &user.id, client_id).await?;
                    return Ok(AuthorizeOutcome::TwoFactorRequired {
                        session_id: session.session_id,
                        expires_in: self.two_factor.session_ttl_secs(),
                    });
                }
            };

            if !passed {
                log::warn!("⚠️ 2FA 확인 실패: tenant={}, client_id={}", tenant, client_id);
                return Err(AppError::AuthenticationError("2단계 인증에 실패했습니다".to_string()));
            }
        }

        let code = self.codes
            .issue_code(IssueCodeRequest {
                tenant_id: tenant.clone(),
                client_id: client_id.to_string(),
                user_id: user.id.clone(),
                redirect_uri: request.redirect_uri.clone(),
                scopes: narrow_scopes(&request.scopes, &user.scopes),
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: request.code_challenge_method,
                direct_login_nonce_hash: None,
            })
            .await?;

        Ok(AuthorizeOutcome::Redirect(build_code_redirect(
            &request.redirect_uri,
            &code,
            request.state.as_deref(),
        )?))
    }

    /// `POST /oauth/token`
    ///
    /// `cookie_nonce`는 직접 로그인 콜백에서 설정된 쿠키 값이며, 폼의
    /// `direct_login_nonce`가 우선합니다.
    pub async fn exchange_token(&self, tenant: &TenantId, request: TokenRequest, cookie_nonce: Option<String>) -> AppResult<TokenResponse> {
        match request.grant_type.as_str() {
            GRANT_AUTHORIZATION_CODE => self.exchange_authorization_code(tenant, request, cookie_nonce).await,
            GRANT_REFRESH_TOKEN => self.exchange_refresh_token(tenant, request).await,
            other => Err(AppError::UnsupportedGrantType(format!("지원하지 않는 grant_type입니다: {}", other))),
        }
    }

    async fn exchange_authorization_code(&self, tenant: &TenantId, request: TokenRequest, cookie_nonce: Option<String>) -> AppResult<TokenResponse> {
        let code = required(request.code.as_deref(), "code")?;
        let redirect_uri = required(request.redirect_uri.as_deref(), "redirect_uri")?;
        let client_id = required(request.client_id.as_deref(), "client_id")?;

        let client = if client_id == DIRECT_LOGIN_CLIENT_ID {
            None
        } else {
            Some(self.find_active_client(tenant, client_id).await?)
        };

        let record = self.codes.redeem_code(tenant, code, client_id, redirect_uri).await?;

        let nonce = request.direct_login_nonce.or(cookie_nonce);
        let proof = authenticate_redemption(
            &record,
            client.as_ref(),
            request.client_secret.as_deref(),
            request.code_verifier.as_deref(),
            nonce.as_deref(),
        )?;

        let user = self.users
            .find_by_id(tenant, &record.user_id)
            .await
            .map_err(|_| AppError::InvalidGrant("유효하지 않은 인가 코드입니다".to_string()))?;

        log::info!("🔄 코드 교환: tenant={}, client_id={}, proof={:?}", tenant, client_id, proof);

        self.tokens.issue_tokens(&token_subject(&user, client_id, record.scopes)).await
    }

    async fn exchange_refresh_token(&self, tenant: &TenantId, request: TokenRequest) -> AppResult<TokenResponse> {
        let raw_token = required(request.refresh_token.as_deref(), "refresh_token")?;
        let client_id = required(request.client_id.as_deref(), "client_id")?;

        self.authenticate_client(tenant, client_id, request.client_secret.as_deref()).await?;

        // 검증은 회전 전에 끝낸다. 거부된 요청이 토큰을 소모하면 안 된다.
        let record = self.tokens.find_active_refresh_token(tenant, raw_token, client_id).await?;

        let scopes = match request.scope.as_deref() {
            Some(scope) => {
                let requested = parse_scopes(Some(scope));
                if requested.is_empty() || !requested.iter().all(|s| record.scopes.contains(s)) {
                    return Err(AppError::InvalidScope("요청한 스코프가 기존 부여 범위를 넘습니다".to_string()));
                }
                requested
            }
            None => record.scopes.clone(),
        };

        let record = self.tokens.consume_refresh_token(tenant, raw_token, client_id).await?;

        let user = self.users
            .find_by_id(tenant, &record.user_id)
            .await
            .ok()
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::InvalidGrant("유효하지 않은 리프레시 토큰입니다".to_string()))?;

        self.tokens.issue_tokens(&token_subject(&user, client_id, scopes)).await
    }

    /// 시크릿이 등록된 클라이언트는 시크릿을 검증합니다. 직접 로그인 클라이언트는 통과.
    async fn authenticate_client(&self, tenant: &TenantId, client_id: &str, secret: Option<&str>) -> AppResult<()> {
        if client_id == DIRECT_LOGIN_CLIENT_ID {
            return Ok(());
        }

        let client = self.find_active_client(tenant, client_id).await?;
        if let Some(hash) = client.client_secret_hash.as_deref() {
            if !bcrypt::verify(secret.unwrap_or_default(), hash).unwrap_or(false) {
                log::warn!("⚠️ 클라이언트 인증 실패: tenant={}, client_id={}", tenant, client_id);
                return Err(AppError::InvalidClient("클라이언트 인증에 실패했습니다".to_string()));
            }
        }

        Ok(())
    }

    /// RFC 7009: 알 수 없는 토큰도 성공으로 응답한다. 액세스 토큰은 폐기 대상이 아니다.
    ///
    /// 다른 클라이언트에 발급된 토큰은 건드리지 않고 성공으로 응답하며,
    /// 기밀 클라이언트의 토큰은 해당 클라이언트 인증이 있어야 폐기된다.
    pub async fn revoke(&self, tenant: &TenantId, request: &RevokeRequest) -> AppResult<()> {
        let caller = request.client_id.as_deref();
        if let Some(client_id) = caller {
            self.authenticate_client(tenant, client_id, request.client_secret.as_deref()).await?;
        }

        if request.token_type_hint.as_deref() == Some("access_token") {
            log::debug!("액세스 토큰 폐기 요청 무시: tenant={}", tenant);
            return Ok(());
        }

        let Some(record) = self.tokens.find_refresh_token(tenant, &request.token).await? else {
            log::debug!("알 수 없는 토큰 폐기 요청: tenant={}", tenant);
            return Ok(());
        };

        match caller {
            Some(client_id) if client_id != record.client_id => {
                log::warn!(
                    "⚠️ 다른 클라이언트의 토큰 폐기 요청 무시: tenant={}, caller={}, owner={}",
                    tenant, client_id, record.client_id
                );
                return Ok(());
            }
            Some(_) => {}
            None => {
                let owner = self.clients.find_by_client_id(tenant, &record.client_id).await?;
                if owner.is_some_and(|c| c.is_confidential()) {
                    return Err(AppError::InvalidClient("클라이언트 인증이 필요합니다".to_string()));
                }
            }
        }

        self.tokens.revoke_refresh_token(tenant, &request.token).await?;
        Ok(())
    }

    pub async fn userinfo(&self, principal: &AuthenticatedUser) -> AppResult<serde_json::Value> {
        if !principal.has_scope("openid") {
            return Err(AppError::AuthorizationError("openid 스코프가 필요합니다".to_string()));
        }

        let user = self.users.find_by_id(&principal.tenant_id, &principal.user_id).await?;

        Ok(json!({
            "sub": user.id,
            "email": user.email,
            "given_name": user.first_name,
            "family_name": user.last_name,
            "tenant_id": user.tenant_id,
            "groups": user.groups,
        }))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> AppResult<&'a str> {
    value.ok_or_else(|| AppError::ValidationError(format!("{}이(가) 필요합니다", name)))
}

fn oauth_service_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(OAuthService::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "oauth_service",
        constructor: oauth_service_constructor,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::services::oauth::pkce::compute_challenge;
    use crate::services::two_factor::totp;

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    fn params(client_id: &str, scope: &str, challenge: Option<String>) -> AuthorizeParams {
        AuthorizeParams {
            response_type: Some("code".to_string()),
            client_id: client_id.to_string(),
            redirect_uri: REDIRECT.to_string(),
            scope: Some(scope.to_string()),
            state: Some("xyz".to_string()),
            code_challenge_method: challenge.as_ref().map(|_| "S256".to_string()),
            code_challenge: challenge,
        }
    }

    fn login(email: &str, password: &str) -> PasswordLogin {
        PasswordLogin {
            email: email.to_string(),
            password: password.to_string(),
            totp_code: None,
            two_factor_session_id: None,
        }
    }

    fn code_from(location: &str) -> String {
        let url = Url::parse(location).unwrap();
        url.query_pairs().find(|(k, _)| k == "code").unwrap().1.to_string()
    }

    fn code_grant(code: &str, client_id: &str) -> TokenRequest {
        TokenRequest {
            grant_type: GRANT_AUTHORIZATION_CODE.to_string(),
            code: Some(code.to_string()),
            redirect_uri: Some(REDIRECT.to_string()),
            client_id: Some(client_id.to_string()),
            client_secret: None,
            code_verifier: None,
            refresh_token: None,
            scope: None,
            direct_login_nonce: None,
        }
    }

    #[test]
    fn test_build_code_redirect_preserves_existing_query() {
        let url = build_code_redirect("https://app/cb?tab=1", "c o", Some("s&t")).unwrap();
        assert_eq!(url, "https://app/cb?tab=1&code=c+o&state=s%26t");
    }

    #[tokio::test]
    async fn test_validate_authorize_rejects_bad_requests() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "web", None).await;

        let mut p = params("web", "read", None);
        p.redirect_uri = "https://app.example.com/callback/".to_string();
        assert!(matches!(h.oauth.validate_authorize(&tenant, &p).await, Err(AppError::ValidationError(_))));

        let mut p = params("web", "read", None);
        p.response_type = Some("token".to_string());
        assert!(h.oauth.validate_authorize(&tenant, &p).await.is_err());

        let p = params("unknown", "read", None);
        assert!(matches!(h.oauth.validate_authorize(&tenant, &p).await, Err(AppError::InvalidClient(_))));

        let mut p = params("web", "read", Some("c".repeat(43)));
        p.code_challenge_method = Some("S512".to_string());
        assert!(h.oauth.validate_authorize(&tenant, &p).await.is_err());

        let other_tenant = TenantId::parse("acme").unwrap();
        assert!(h.oauth.validate_authorize(&other_tenant, &params("web", "read", None)).await.is_err());
    }

    #[tokio::test]
    async fn test_pkce_flow_issues_tenant_scoped_tokens() {
        let h = Harness::new();
        let tenant = TenantId::parse("acme").unwrap();
        h.add_client(&tenant, "spa", None).await;
        h.add_user(&tenant, "ada@example.com", "pw", &["read", "openid", "email"]).await;

        let challenge = compute_challenge(CodeChallengeMethod::S256, VERIFIER);
        let request = h.oauth.validate_authorize(&tenant, &params("spa", "openid email admin", Some(challenge))).await.unwrap();
        let outcome = h.oauth.authorize(&tenant, &request, login("ada@example.com", "pw")).await.unwrap();

        let AuthorizeOutcome::Redirect(location) = outcome else { panic!("expected redirect") };
        assert!(location.starts_with(REDIRECT));
        assert!(location.contains("state=xyz"));

        let mut grant = code_grant(&code_from(&location), "spa");
        grant.code_verifier = Some(VERIFIER.to_string());
        let tokens = h.oauth.exchange_token(&tenant, grant, None).await.unwrap();

        assert_eq!(tokens.scope, "openid email");
        assert!(tokens.id_token.is_some());

        let claims = h.tokens.validate_access_token(&tokens.access_token, &tenant).unwrap();
        assert_eq!(claims.tenant_id, tenant);
        assert_eq!(claims.scopes, vec!["openid", "email"]);
        assert_eq!(claims.client_id, "spa");
    }

    #[tokio::test]
    async fn test_wrong_verifier_burns_code() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "spa", None).await;
        h.add_user(&tenant, "ada@example.com", "pw", &["read"]).await;

        let challenge = compute_challenge(CodeChallengeMethod::S256, VERIFIER);
        let request = h.oauth.validate_authorize(&tenant, &params("spa", "read", Some(challenge))).await.unwrap();
        let AuthorizeOutcome::Redirect(location) = h.oauth.authorize(&tenant, &request, login("ada@example.com", "pw")).await.unwrap() else {
            panic!("expected redirect")
        };
        let code = code_from(&location);

        let mut wrong = code_grant(&code, "spa");
        wrong.code_verifier = Some("x".repeat(43));
        assert!(matches!(h.oauth.exchange_token(&tenant, wrong, None).await, Err(AppError::InvalidGrant(_))));

        let mut right = code_grant(&code, "spa");
        right.code_verifier = Some(VERIFIER.to_string());
        assert!(h.oauth.exchange_token(&tenant, right, None).await.is_err());
    }

    #[tokio::test]
    async fn test_confidential_client_secret_flow_and_refresh_rotation() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "backend", Some("s3cret")).await;
        h.add_user(&tenant, "ada@example.com", "pw", &["read", "write"]).await;

        let request = h.oauth.validate_authorize(&tenant, &params("backend", "read write", None)).await.unwrap();
        let AuthorizeOutcome::Redirect(location) = h.oauth.authorize(&tenant, &request, login("ada@example.com", "pw")).await.unwrap() else {
            panic!("expected redirect")
        };

        let mut grant = code_grant(&code_from(&location), "backend");
        grant.client_secret = Some("s3cret".to_string());
        let tokens = h.oauth.exchange_token(&tenant, grant, None).await.unwrap();
        assert!(tokens.id_token.is_none());

        let refresh = TokenRequest {
            grant_type: GRANT_REFRESH_TOKEN.to_string(),
            refresh_token: Some(tokens.refresh_token.clone()),
            client_id: Some("backend".to_string()),
            client_secret: Some("s3cret".to_string()),
            scope: Some("read".to_string()),
            ..code_grant("", "backend")
        };
        let rotated = h.oauth.exchange_token(&tenant, refresh.clone(), None).await.unwrap();
        assert_eq!(rotated.scope, "read");
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        assert!(matches!(h.oauth.exchange_token(&tenant, refresh, None).await, Err(AppError::InvalidGrant(_))));

        let widen = TokenRequest {
            refresh_token: Some(rotated.refresh_token.clone()),
            scope: Some("read admin".to_string()),
            client_secret: Some("s3cret".to_string()),
            ..code_grant("", "backend")
        };
        let widen = TokenRequest { grant_type: GRANT_REFRESH_TOKEN.to_string(), ..widen };
        assert!(matches!(h.oauth.exchange_token(&tenant, widen, None).await, Err(AppError::InvalidScope(_))));
    }

    fn refresh_grant(refresh_token: &str, client_id: &str, secret: Option<&str>, scope: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: GRANT_REFRESH_TOKEN.to_string(),
            refresh_token: Some(refresh_token.to_string()),
            client_secret: secret.map(str::to_string),
            scope: scope.map(str::to_string),
            ..code_grant("", client_id)
        }
    }

    #[tokio::test]
    async fn test_rejected_scope_widening_keeps_refresh_token() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "backend", Some("s3cret")).await;
        let user = h.add_user(&tenant, "ada@example.com", "pw", &["read", "admin"]).await;

        let tokens = h.tokens.issue_tokens(&token_subject(&user, "backend", vec!["read".to_string()])).await.unwrap();

        let widen = refresh_grant(&tokens.refresh_token, "backend", Some("s3cret"), Some("read admin"));
        assert!(matches!(h.oauth.exchange_token(&tenant, widen, None).await, Err(AppError::InvalidScope(_))));

        let wrong_secret = refresh_grant(&tokens.refresh_token, "backend", Some("nope"), None);
        assert!(matches!(h.oauth.exchange_token(&tenant, wrong_secret, None).await, Err(AppError::InvalidClient(_))));

        let retry = refresh_grant(&tokens.refresh_token, "backend", Some("s3cret"), None);
        let rotated = h.oauth.exchange_token(&tenant, retry, None).await.unwrap();
        assert_eq!(rotated.scope, "read");
        assert_ne!(rotated.refresh_token, tokens.refresh_token);
    }

    #[tokio::test]
    async fn test_unsupported_grant_type() {
        let h = Harness::new();
        let request = TokenRequest { grant_type: "password".to_string(), ..code_grant("c", "web") };

        let result = h.oauth.exchange_token(&TenantId::default_tenant(), request, None).await;
        assert!(matches!(result, Err(AppError::UnsupportedGrantType(_))));
    }

    #[tokio::test]
    async fn test_two_factor_gate_with_inline_code_and_session() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "web", Some("s3cret")).await;
        let user = h.add_user(&tenant, "ada@example.com", "pw", &["read"]).await;

        let setup = h.two_factor.begin_enrollment(&tenant, &user.id).await.unwrap();
        let code = totp::code_at(&setup.secret, NOW);
        h.two_factor.confirm_enrollment(&tenant, &user.id, &code, &setup.secret).await.unwrap();

        let request = h.oauth.validate_authorize(&tenant, &params("web", "read", None)).await.unwrap();

        let outcome = h.oauth.authorize(&tenant, &request, login("ada@example.com", "pw")).await.unwrap();
        let AuthorizeOutcome::TwoFactorRequired { session_id, expires_in } = outcome else {
            panic!("expected two factor challenge")
        };
        assert_eq!(expires_in, 300);

        let unverified = PasswordLogin { two_factor_session_id: Some(session_id.clone()), ..login("ada@example.com", "pw") };
        assert!(h.oauth.authorize(&tenant, &request, unverified.clone()).await.is_err());

        assert!(h.two_factor.verify_session(&tenant, &session_id, &code).await.unwrap().verified);
        let outcome = h.oauth.authorize(&tenant, &request, unverified).await.unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::Redirect(_)));

        let inline = PasswordLogin { totp_code: Some(code), ..login("ada@example.com", "pw") };
        assert!(matches!(h.oauth.authorize(&tenant, &request, inline).await.unwrap(), AuthorizeOutcome::Redirect(_)));

        let wrong = PasswordLogin { totp_code: Some("ZZZZZZZZZZ".to_string()), ..login("ada@example.com", "pw") };
        assert!(matches!(h.oauth.authorize(&tenant, &request, wrong).await, Err(AppError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_revoke_and_userinfo() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        let user = h.add_user(&tenant, "ada@example.com", "pw", &["openid"]).await;

        let tokens = h.tokens.issue_tokens(&token_subject(&user, "web", vec!["openid".to_string()])).await.unwrap();
        let revoke = RevokeRequest { token: tokens.refresh_token.clone(), token_type_hint: None, client_id: None, client_secret: None };
        h.oauth.revoke(&tenant, &revoke).await.unwrap();
        h.oauth.revoke(&tenant, &revoke).await.unwrap();
        assert!(h.tokens.consume_refresh_token(&tenant, &tokens.refresh_token, "web").await.is_err());

        let claims = h.tokens.validate_access_token(&tokens.access_token, &tenant).unwrap();
        let info = h.oauth.userinfo(&AuthenticatedUser::from(claims)).await.unwrap();
        assert_eq!(info["sub"], user.id);
        assert_eq!(info["email"], "ada@example.com");

        let no_openid = AuthenticatedUser {
            user_id: user.id.clone(),
            tenant_id: tenant.clone(),
            client_id: "web".to_string(),
            scopes: vec!["read".to_string()],
            groups: vec![],
        };
        assert!(matches!(h.oauth.userinfo(&no_openid).await, Err(AppError::AuthorizationError(_))));
    }

    async fn refresh_is_active(h: &Harness, tenant: &TenantId, raw_token: &str) -> bool {
        h.tokens.find_active_refresh_token(tenant, raw_token, "backend").await.is_ok()
    }

    #[tokio::test]
    async fn test_revoke_authenticates_owning_client() {
        let h = Harness::new();
        let tenant = TenantId::default_tenant();
        h.add_client(&tenant, "backend", Some("s3cret")).await;
        h.add_client(&tenant, "spa", None).await;
        let user = h.add_user(&tenant, "ada@example.com", "pw", &["read"]).await;

        let tokens = h.tokens.issue_tokens(&token_subject(&user, "backend", vec!["read".to_string()])).await.unwrap();
        let revoke = |client_id: Option<&str>, secret: Option<&str>| RevokeRequest {
            token: tokens.refresh_token.clone(),
            token_type_hint: None,
            client_id: client_id.map(str::to_string),
            client_secret: secret.map(str::to_string),
        };

        let anonymous = h.oauth.revoke(&tenant, &revoke(None, None)).await;
        assert!(matches!(anonymous, Err(AppError::InvalidClient(_))));
        assert!(refresh_is_active(&h, &tenant, &tokens.refresh_token).await);

        let wrong_secret = h.oauth.revoke(&tenant, &revoke(Some("backend"), Some("nope"))).await;
        assert!(matches!(wrong_secret, Err(AppError::InvalidClient(_))));
        assert!(refresh_is_active(&h, &tenant, &tokens.refresh_token).await);

        h.oauth.revoke(&tenant, &revoke(Some("spa"), None)).await.unwrap();
        assert!(refresh_is_active(&h, &tenant, &tokens.refresh_token).await);

        h.oauth.revoke(&tenant, &revoke(Some("backend"), Some("s3cret"))).await.unwrap();
        assert!(!refresh_is_active(&h, &tenant, &tokens.refresh_token).await);
    }
}
