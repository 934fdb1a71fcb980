//! JWT 액세스 토큰과 불투명 리프레시 토큰 관리 서비스
//!
//! # 토큰 종류
//!
//! | 토큰 | 형태 | 저장 | 폐기 |
//! |------|------|------|------|
//! | Access | HS256 JWT | 저장하지 않음 | 불가 (짧은 만료) |
//! | Refresh | 32바이트 base64url | SHA-256 해시로 저장 | `revoked=true` |
//! | ID | HS256 JWT (`openid` 스코프) | 저장하지 않음 | - |
//!
//! 액세스 토큰 검증은 서명과 `exp`만 확인하는 무상태 검증이며, 호출 측 테넌트와
//! 토큰의 `tenant_id`가 다르면 거부합니다.
//!
//! # Examples
//!
//! ```rust,ignore
//! let token_service = TokenService::instance();
//! let response = token_service.issue_tokens(&subject).await?;
//! let claims = token_service.validate_access_token(&response.access_token, &tenant)?;
//! ```

use std::any::Any;
use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::OnceCell;
use serde_json::json;

use crate::config::{IssuerConfig, JwtConfig};
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::{ServiceLocator, ServiceRegistration};
use crate::domain::entities::oauth::RefreshToken;
use crate::domain::models::tenant::TenantId;
use crate::domain::models::token::{
    AccessTokenClaims, IdTokenClaims, TokenResponse, TokenSubject, TOKEN_TYPE_BEARER,
};
use crate::repositories::Repositories;
use crate::repositories::tokens::RefreshTokenStore;
use crate::utils::digest::sha256_hex;
use crate::utils::string_utils::join_scopes;
use crate::utils::{Clock, OsRandomSource, RandomSource, SystemClock};

const REFRESH_TOKEN_BYTES: usize = 32;
const OPENID_SCOPE: &str = "openid";
const INVALID_TOKEN: &str = "유효하지 않은 토큰입니다";
const INVALID_REFRESH_TOKEN: &str = "유효하지 않은 리프레시 토큰입니다";

/// 서명 키와 만료 설정
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub key_id: String,
    pub issuer_base: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl TokenSettings {
    pub fn from_env() -> Self {
        Self {
            secret: JwtConfig::secret(),
            key_id: JwtConfig::key_id(),
            issuer_base: IssuerConfig::base_url(),
            access_ttl_secs: JwtConfig::access_token_minutes() * 60,
            refresh_ttl_secs: JwtConfig::refresh_token_days() * 24 * 60 * 60,
        }
    }
}

pub struct TokenService {
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    settings: TokenSettings,
}

static TOKEN_SERVICE_INSTANCE: OnceCell<Arc<TokenService>> = OnceCell::new();

impl TokenService {
    pub fn instance() -> Arc<Self> {
        TOKEN_SERVICE_INSTANCE
            .get_or_init(|| {
                let repos = ServiceLocator::get::<Repositories>();
                Arc::new(Self::new(
                    repos.refresh_tokens.clone(),
                    Arc::new(SystemClock),
                    Arc::new(OsRandomSource),
                    TokenSettings::from_env(),
                ))
            })
            .clone()
    }

    pub fn new(
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            refresh_tokens,
            clock,
            random,
            settings,
        }
    }

    /// 테넌트별 발급자 URL. 기본 테넌트는 접두사 없이 기본 URL 그대로다.
    pub fn issuer_for(&self, tenant: &TenantId) -> String {
        format!("{}{}", self.settings.issuer_base, tenant.path_prefix())
    }

    fn header(&self) -> Header {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.settings.key_id.clone());
        header
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> AppResult<String> {
        let encoding_key = EncodingKey::from_secret(self.settings.secret.as_bytes());
        encode(&self.header(), claims, &encoding_key)
            .map_err(|e| AppError::InternalError(format!("JWT 토큰 생성 실패: {}", e)))
    }

    /// 액세스 토큰, 리프레시 토큰, (`openid` 스코프가 있으면) ID 토큰을 발급합니다.
    ///
    /// 리프레시 토큰 원문은 응답으로만 나가고 저장소에는 해시만 남습니다.
    pub async fn issue_tokens(&self, subject: &TokenSubject) -> AppResult<TokenResponse> {
        let now = self.clock.timestamp();
        let jti = uuid::Uuid::new_v4().to_string();
        let issuer = self.issuer_for(&subject.tenant_id);

        let claims = AccessTokenClaims {
            sub: subject.user_id.clone(),
            tenant_id: subject.tenant_id.clone(),
            client_id: subject.client_id.clone(),
            scopes: subject.scopes.clone(),
            groups: subject.groups.clone(),
            iss: issuer.clone(),
            iat: now,
            exp: now + self.settings.access_ttl_secs,
            jti: jti.clone(),
        };
        let access_token = self.sign(&claims)?;

        let refresh_token = self.random.random_token(REFRESH_TOKEN_BYTES)?;
        let record = RefreshToken {
            token_hash: sha256_hex(&refresh_token),
            tenant_id: subject.tenant_id.clone(),
            access_token_id: jti,
            client_id: subject.client_id.clone(),
            user_id: subject.user_id.clone(),
            scopes: subject.scopes.clone(),
            expires_at: now + self.settings.refresh_ttl_secs,
            revoked: false,
            revoked_at: None,
            created_at: now,
        };
        self.refresh_tokens.insert(&record).await?;

        let id_token = if subject.scopes.iter().any(|s| s == OPENID_SCOPE) {
            let id_claims = IdTokenClaims {
                iss: issuer,
                sub: subject.user_id.clone(),
                aud: subject.client_id.clone(),
                iat: now,
                exp: now + self.settings.access_ttl_secs,
                tenant_id: subject.tenant_id.clone(),
                email: subject.email.clone(),
                given_name: subject.given_name.clone(),
                family_name: subject.family_name.clone(),
            };
            Some(self.sign(&id_claims)?)
        } else {
            None
        };

        log::info!(
            "🔑 토큰 발급: tenant={}, user_id={}, client_id={}, id_token={}",
            subject.tenant_id, subject.user_id, subject.client_id, id_token.is_some()
        );

        Ok(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.settings.access_ttl_secs,
            refresh_token,
            scope: join_scopes(&subject.scopes),
            id_token,
        })
    }

    /// 서명, 만료, 테넌트 일치만으로 액세스 토큰을 검증합니다.
    pub fn validate_access_token(&self, token: &str, expected_tenant: &TenantId) -> AppResult<AccessTokenClaims> {
        let decoding_key = DecodingKey::from_secret(self.settings.secret.as_bytes());

        // 만료는 주입된 시계로 직접 판정한다
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = decode::<AccessTokenClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("액세스 토큰 디코딩 실패: {}", e);
                AppError::AuthenticationError(INVALID_TOKEN.to_string())
            })?;

        if self.clock.timestamp() >= claims.exp {
            return Err(AppError::AuthenticationError("토큰이 만료되었습니다".to_string()));
        }

        if &claims.tenant_id != expected_tenant {
            log::warn!(
                "⚠️ 테넌트 불일치 토큰: token_tenant={}, request_tenant={}",
                claims.tenant_id, expected_tenant
            );
            return Err(AppError::AuthenticationError(INVALID_TOKEN.to_string()));
        }

        Ok(claims)
    }

    /// 저장된 리프레시 토큰 레코드. 폐기/만료 여부와 관계없이 돌려준다.
    pub async fn find_refresh_token(&self, tenant: &TenantId, raw_token: &str) -> AppResult<Option<RefreshToken>> {
        self.refresh_tokens.find(tenant, &sha256_hex(raw_token)).await
    }

    /// 활성 상태이고 `client_id`에 발급된 리프레시 토큰을 조회만 합니다.
    pub async fn find_active_refresh_token(&self, tenant: &TenantId, raw_token: &str, client_id: &str) -> AppResult<RefreshToken> {
        let now = self.clock.timestamp();

        self.find_refresh_token(tenant, raw_token)
            .await?
            .filter(|record| record.is_active_at(now) && record.client_id == client_id)
            .ok_or_else(|| AppError::InvalidGrant(INVALID_REFRESH_TOKEN.to_string()))
    }

    /// 리프레시 토큰을 회전용으로 소비합니다.
    ///
    /// 요청 검증이 모두 끝난 뒤에 호출해야 합니다. 폐기 CAS에서 이긴 요청만
    /// 기존 레코드를 돌려받습니다.
    pub async fn consume_refresh_token(&self, tenant: &TenantId, raw_token: &str, client_id: &str) -> AppResult<RefreshToken> {
        let record = self.find_active_refresh_token(tenant, raw_token, client_id).await?;

        if !self.refresh_tokens.revoke(tenant, &record.token_hash, self.clock.timestamp()).await? {
            log::warn!("⚠️ 리프레시 토큰 재사용 시도: tenant={}, client_id={}", tenant, client_id);
            return Err(AppError::InvalidGrant(INVALID_REFRESH_TOKEN.to_string()));
        }

        Ok(record)
    }

    /// 리프레시 토큰을 폐기합니다. 처음 폐기한 경우에만 `true`.
    pub async fn revoke_refresh_token(&self, tenant: &TenantId, raw_token: &str) -> AppResult<bool> {
        let revoked = self.refresh_tokens
            .revoke(tenant, &sha256_hex(raw_token), self.clock.timestamp())
            .await?;

        if revoked {
            log::info!("🗑️ 리프레시 토큰 폐기: tenant={}", tenant);
        }

        Ok(revoked)
    }

    /// 대칭 키이므로 키 값(`k`)은 공개하지 않고 식별 정보만 내보낸다.
    pub fn jwks(&self) -> serde_json::Value {
        json!({
            "keys": [{
                "kty": "oct",
                "kid": self.settings.key_id,
                "alg": "HS256",
                "use": "sig",
            }]
        })
    }

    pub fn extract_bearer_token(auth_header: &str) -> AppResult<&str> {
        auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::AuthenticationError("유효하지 않은 인증 헤더 형식입니다".to_string()))
    }
}

fn token_service_constructor() -> Box<dyn Any + Send + Sync> {
    Box::new(TokenService::instance() as Arc<dyn Any + Send + Sync>)
}

inventory::submit! {
    ServiceRegistration {
        name: "token_service",
        constructor: token_service_constructor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryRefreshTokenStore;
    use crate::utils::clock::ManualClock;
    use crate::utils::random::FailingRandomSource;

    const NOW: i64 = 1_700_000_000;

    fn settings() -> TokenSettings {
        TokenSettings {
            secret: "test-secret".to_string(),
            key_id: "k1".to_string(),
            issuer_base: "https://auth.example.com".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 86_400,
        }
    }

    fn service(clock: Arc<ManualClock>) -> TokenService {
        TokenService::new(
            Arc::new(InMemoryRefreshTokenStore::new()),
            clock,
            Arc::new(OsRandomSource),
            settings(),
        )
    }

    fn subject(tenant: &str, scopes: &[&str]) -> TokenSubject {
        TokenSubject {
            tenant_id: TenantId::parse(tenant).unwrap(),
            user_id: "u1".to_string(),
            client_id: "web".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            groups: vec!["staff".to_string()],
            email: Some("user@example.com".to_string()),
            given_name: None,
            family_name: None,
        }
    }

    #[tokio::test]
    async fn test_issue_and_validate_access_token() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read", "write"]);

        let response = service.issue_tokens(&subject).await.unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 900);
        assert_eq!(response.scope, "read write");
        assert!(response.id_token.is_none());

        let claims = service.validate_access_token(&response.access_token, &subject.tenant_id).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.tenant_id.as_str(), "acme");
        assert_eq!(claims.scopes, vec!["read", "write"]);
        assert_eq!(claims.iss, "https://auth.example.com/t/acme");
    }

    #[tokio::test]
    async fn test_expired_access_token_rejected() {
        let clock = Arc::new(ManualClock::at(NOW));
        let service = service(clock.clone());
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        clock.advance_secs(899);
        assert!(service.validate_access_token(&response.access_token, &subject.tenant_id).is_ok());

        clock.advance_secs(1);
        let result = service.validate_access_token(&response.access_token, &subject.tenant_id);
        assert!(matches!(result, Err(AppError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_tenant_mismatch_rejected() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let response = service.issue_tokens(&subject("acme", &["read"])).await.unwrap();

        let result = service.validate_access_token(&response.access_token, &TenantId::parse("globex").unwrap());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tampered_signature_rejected() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        let other = TokenService::new(
            Arc::new(InMemoryRefreshTokenStore::new()),
            Arc::new(ManualClock::at(NOW)),
            Arc::new(OsRandomSource),
            TokenSettings { secret: "other".to_string(), ..settings() },
        );
        assert!(other.validate_access_token(&response.access_token, &subject.tenant_id).is_err());
        assert!(service.validate_access_token("not.a.jwt", &subject.tenant_id).is_err());
    }

    #[tokio::test]
    async fn test_openid_scope_adds_id_token() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let response = service.issue_tokens(&subject("acme", &["openid", "email"])).await.unwrap();

        let id_token = response.id_token.expect("id_token");
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(&["web"]);
        let claims = decode::<IdTokenClaims>(&id_token, &DecodingKey::from_secret(b"test-secret"), &validation)
            .unwrap()
            .claims;

        assert_eq!(claims.aud, "web");
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_refresh_token_rotates_once() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        let record = service
            .consume_refresh_token(&subject.tenant_id, &response.refresh_token, "web")
            .await
            .unwrap();
        assert_eq!(record.user_id, "u1");

        let replay = service.consume_refresh_token(&subject.tenant_id, &response.refresh_token, "web").await;
        assert!(matches!(replay, Err(AppError::InvalidGrant(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_bound_to_client() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        let result = service.consume_refresh_token(&subject.tenant_id, &response.refresh_token, "mobile").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_find_active_refresh_token_does_not_rotate() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        let found = service
            .find_active_refresh_token(&subject.tenant_id, &response.refresh_token, "web")
            .await
            .unwrap();
        assert_eq!(found.scopes, vec!["read"]);

        let record = service.consume_refresh_token(&subject.tenant_id, &response.refresh_token, "web").await;
        assert!(record.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_cannot_refresh() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let subject = subject("acme", &["read"]);
        let response = service.issue_tokens(&subject).await.unwrap();

        assert!(service.revoke_refresh_token(&subject.tenant_id, &response.refresh_token).await.unwrap());
        assert!(!service.revoke_refresh_token(&subject.tenant_id, &response.refresh_token).await.unwrap());

        let result = service.consume_refresh_token(&subject.tenant_id, &response.refresh_token, "web").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entropy_failure_aborts_issuance() {
        let service = TokenService::new(
            Arc::new(InMemoryRefreshTokenStore::new()),
            Arc::new(ManualClock::at(NOW)),
            Arc::new(FailingRandomSource),
            settings(),
        );

        let result = service.issue_tokens(&subject("acme", &["read"])).await;
        assert!(matches!(result, Err(AppError::EntropyError(_))));
    }

    #[test]
    fn test_jwks_hides_secret() {
        let service = service(Arc::new(ManualClock::at(NOW)));
        let jwks = service.jwks();
        let key = &jwks["keys"][0];

        assert_eq!(key["kty"], "oct");
        assert_eq!(key["kid"], "k1");
        assert!(key.get("k").is_none());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(TokenService::extract_bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert!(TokenService::extract_bearer_token("Basic abc").is_err());
        assert!(TokenService::extract_bearer_token("Bearer ").is_err());
    }
}
