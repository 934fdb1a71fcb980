//! 외부 로그인 제공자 인터페이스
//!
//! 제공자마다 인가 URL, 코드 교환, 프로필 형태가 다르므로 [`SocialProvider`] 구현 하나가
//! 제공자 하나를 담당합니다. 브로커는 [`ProviderDirectory`]를 통해 구현을 얻으며,
//! 자격 증명은 제공자를 처음 사용할 때 로드되어 누락 시 즉시 설정 오류가 됩니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::{AuthProvider, SocialConfig, SocialProviderConfig};
use crate::core::errors::{AppError, AppResult, ErrorContext};
use crate::domain::models::social::{ExternalProfile, ExternalToken};
use crate::services::social::apple::AppleProvider;
use crate::services::social::facebook::FacebookProvider;
use crate::services::social::github::GitHubProvider;
use crate::services::social::google::GoogleProvider;

#[async_trait]
pub trait SocialProvider: Send + Sync {
    fn kind(&self) -> AuthProvider;

    /// 사용자를 보낼 제공자 인가 URL. `state`는 브로커가 발급한 값 그대로 실린다.
    fn auth_url(&self, state: &str) -> AppResult<String>;

    async fn exchange_code(&self, code: &str) -> AppResult<ExternalToken>;

    async fn fetch_profile(&self, token: &ExternalToken) -> AppResult<ExternalProfile>;
}

pub trait ProviderDirectory: Send + Sync {
    fn provider(&self, kind: AuthProvider) -> AppResult<Arc<dyn SocialProvider>>;
}

/// 환경 변수 설정으로 제공자를 구성하는 기본 디렉터리
pub struct ConfiguredProviders {
    http: reqwest::Client,
}

impl ConfiguredProviders {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            http: http_client(SocialConfig::http_timeout_secs())?,
        })
    }
}

impl ProviderDirectory for ConfiguredProviders {
    fn provider(&self, kind: AuthProvider) -> AppResult<Arc<dyn SocialProvider>> {
        match kind {
            AuthProvider::Google => Ok(Arc::new(GoogleProvider::new(SocialProviderConfig::load(kind)?, self.http.clone()))),
            AuthProvider::GitHub => Ok(Arc::new(GitHubProvider::new(SocialProviderConfig::load(kind)?, self.http.clone()))),
            AuthProvider::Facebook => Ok(Arc::new(FacebookProvider::new(SocialProviderConfig::load(kind)?, self.http.clone()))),
            AuthProvider::Apple => Ok(Arc::new(AppleProvider)),
            AuthProvider::Local => Err(AppError::NotFound("지원하지 않는 로그인 제공자입니다: local".to_string())),
        }
    }
}

/// 모든 제공자 호출이 공유하는 HTTP 클라이언트. 응답이 없으면 `timeout_secs` 후 실패한다.
pub fn http_client(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("HTTP 클라이언트 생성 실패")
}

/// `{auth_url}?client_id=..&redirect_uri=..&response_type=code&scope=..&state=..`
pub fn authorization_url(config: &SocialProviderConfig, scope: &str, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", scope),
        ("state", state),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.auth_url, query_string)
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 요청을 보내고 2xx JSON 본문을 `T`로 읽는다. 전송 실패, 비 2xx, 파싱 실패는 모두 업스트림 오류.
pub async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder, provider: AuthProvider, what: &str) -> AppResult<T> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            log::error!("❌ {} {} 요청 실패: {}", provider.as_str(), what, e);
            AppError::ExternalServiceError(format!("{} {} 요청 실패: {}", provider.as_str(), what, e))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        log::error!("❌ {} {} 실패: status={}, body={}", provider.as_str(), what, status, error_text);
        return Err(AppError::ExternalServiceError(format!(
            "{} {} 실패: {}",
            provider.as_str(),
            what,
            status
        )));
    }

    response.json::<T>().await.map_err(|e| {
        log::error!("❌ {} {} 응답 파싱 실패: {}", provider.as_str(), what, e);
        AppError::ExternalServiceError(format!("{} {} 응답 파싱 실패: {}", provider.as_str(), what, e))
    })
}

/// 표준 authorization_code 교환 (폼 POST)
pub async fn exchange_code_form(
    http: &reqwest::Client,
    config: &SocialProviderConfig,
    provider: AuthProvider,
    code: &str,
) -> AppResult<ExternalToken> {
    let params = [
        ("code", code),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let body: TokenEndpointResponse = send_json(http.post(&config.token_url).form(&params), provider, "토큰 교환").await?;

    match body.access_token.filter(|t| !t.is_empty()) {
        Some(access_token) => Ok(ExternalToken { access_token }),
        None => {
            log::error!("❌ {} 토큰 응답에 access_token 없음: error={:?}", provider.as_str(), body.error);
            Err(AppError::ExternalServiceError(format!("{} 토큰 교환 실패", provider.as_str())))
        }
    }
}

/// 표시 이름을 이름/성으로 나눈다. 공백이 없으면 전체를 이름으로 본다.
pub fn split_name(name: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return (None, None);
    };

    match name.split_once(' ') {
        Some((first, last)) => (Some(first.to_string()), Some(last.trim().to_string())),
        None => (Some(name.to_string()), None),
    }
}

#[cfg(test)]
pub(crate) fn test_config(server_uri: &str) -> SocialProviderConfig {
    SocialProviderConfig {
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        redirect_uri: "https://auth.example.com/auth/x/callback".to_string(),
        auth_url: format!("{}/authorize", server_uri),
        token_url: format!("{}/token", server_uri),
        api_base: server_uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let config = test_config("https://idp.example.com");
        let url = authorization_url(&config, "openid email", "st/ate");

        assert!(url.starts_with("https://idp.example.com/authorize?client_id=cid&"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fauth.example.com%2Fauth%2Fx%2Fcallback"));
        assert!(url.contains("scope=openid%20email"));
        assert!(url.contains("state=st%2Fate"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name(Some("Ada King Lovelace")), (Some("Ada".into()), Some("King Lovelace".into())));
        assert_eq!(split_name(Some("ada")), (Some("ada".into()), None));
        assert_eq!(split_name(Some("  ")), (None, None));
    }

    #[test]
    fn test_local_provider_not_in_directory() {
        let directory = ConfiguredProviders::new().unwrap();
        assert!(directory.provider(AuthProvider::Local).is_err());
        assert_eq!(directory.provider(AuthProvider::Apple).unwrap().kind(), AuthProvider::Apple);
    }

    #[tokio::test]
    async fn test_exchange_code_form_success_and_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "ext-token"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=bad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "bad_verification_code"})))
            .mount(&server)
            .await;

        let http = http_client(5).unwrap();
        let config = test_config(&server.uri());

        let token = exchange_code_form(&http, &config, AuthProvider::GitHub, "good").await.unwrap();
        assert_eq!(token.access_token, "ext-token");

        let failed = exchange_code_form(&http, &config, AuthProvider::GitHub, "bad").await;
        assert!(matches!(failed, Err(AppError::ExternalServiceError(_))));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = http_client(5).unwrap();
        let result = exchange_code_form(&http, &test_config(&server.uri()), AuthProvider::Google, "c").await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "late"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let http = http_client(1).unwrap();
        let result = exchange_code_form(&http, &test_config(&server.uri()), AuthProvider::Google, "c").await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    }
}
