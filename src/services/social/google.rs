//! Google 로그인 (OIDC userinfo)

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{AuthProvider, SocialProviderConfig};
use crate::core::errors::AppResult;
use crate::domain::models::social::{ExternalProfile, ExternalToken};
use crate::services::social::provider::{authorization_url, exchange_code_form, send_json, SocialProvider};

const GOOGLE_SCOPE: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

pub struct GoogleProvider {
    config: SocialProviderConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: SocialProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl SocialProvider for GoogleProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::Google
    }

    fn auth_url(&self, state: &str) -> AppResult<String> {
        Ok(authorization_url(&self.config, GOOGLE_SCOPE, state))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ExternalToken> {
        exchange_code_form(&self.http, &self.config, AuthProvider::Google, code).await
    }

    async fn fetch_profile(&self, token: &ExternalToken) -> AppResult<ExternalProfile> {
        let request = self.http
            .get(format!("{}/v1/userinfo", self.config.api_base))
            .bearer_auth(&token.access_token);
        let info: GoogleUserInfo = send_json(request, AuthProvider::Google, "사용자 정보 조회").await?;

        // 검증되지 않은 이메일로는 기존 계정에 연결하지 않는다
        let email = info.email.filter(|_| info.email_verified.unwrap_or(true));

        Ok(ExternalProfile {
            external_id: info.sub,
            email,
            first_name: info.given_name,
            last_name: info.family_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::social::provider::{http_client, test_config};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_profile_normalizes_userinfo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/userinfo"))
            .and(header("authorization", "Bearer g-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "1234",
                "email": "ada@gmail.com",
                "email_verified": true,
                "given_name": "Ada",
                "family_name": "Lovelace"
            })))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        let profile = provider
            .fetch_profile(&ExternalToken { access_token: "g-token".to_string() })
            .await
            .unwrap();

        assert_eq!(profile.external_id, "1234");
        assert_eq!(profile.email.as_deref(), Some("ada@gmail.com"));
        assert_eq!(profile.last_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn test_unverified_email_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "1234",
                "email": "ada@gmail.com",
                "email_verified": false
            })))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        let profile = provider
            .fetch_profile(&ExternalToken { access_token: "t".to_string() })
            .await
            .unwrap();

        assert!(profile.email.is_none());
    }
}
