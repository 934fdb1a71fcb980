//! GitHub 로그인
//!
//! `/user`의 `email`은 사용자가 공개 이메일을 설정하지 않으면 비어 있으므로,
//! 그때는 `/user/emails`에서 검증된 기본(primary) 이메일을 찾습니다.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{AuthProvider, SocialProviderConfig};
use crate::core::errors::AppResult;
use crate::domain::models::social::{ExternalProfile, ExternalToken};
use crate::services::social::provider::{authorization_url, exchange_code_form, send_json, split_name, SocialProvider};

const GITHUB_SCOPE: &str = "read:user user:email";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

pub struct GitHubProvider {
    config: SocialProviderConfig,
    http: reqwest::Client,
}

impl GitHubProvider {
    pub fn new(config: SocialProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn primary_verified_email(&self, token: &ExternalToken) -> AppResult<Option<String>> {
        let request = self.http
            .get(format!("{}/user/emails", self.config.api_base))
            .bearer_auth(&token.access_token);
        let emails: Vec<GitHubEmail> = send_json(request, AuthProvider::GitHub, "이메일 조회").await?;

        Ok(emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email))
    }
}

#[async_trait]
impl SocialProvider for GitHubProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::GitHub
    }

    fn auth_url(&self, state: &str) -> AppResult<String> {
        Ok(authorization_url(&self.config, GITHUB_SCOPE, state))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ExternalToken> {
        exchange_code_form(&self.http, &self.config, AuthProvider::GitHub, code).await
    }

    async fn fetch_profile(&self, token: &ExternalToken) -> AppResult<ExternalProfile> {
        let request = self.http
            .get(format!("{}/user", self.config.api_base))
            .bearer_auth(&token.access_token);
        let user: GitHubUser = send_json(request, AuthProvider::GitHub, "사용자 정보 조회").await?;

        let email = match user.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => Some(email),
            None => {
                log::debug!("GitHub 공개 이메일 없음, /user/emails 조회: login={}", user.login);
                self.primary_verified_email(token).await?
            }
        };

        let (first_name, last_name) = match split_name(user.name.as_deref()) {
            (None, _) => (Some(user.login.clone()), None),
            names => names,
        };

        Ok(ExternalProfile {
            external_id: user.id.to_string(),
            email,
            first_name,
            last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::social::provider::{http_client, test_config};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> ExternalToken {
        ExternalToken { access_token: "gh-token".to_string() }
    }

    #[tokio::test]
    async fn test_public_email_skips_emails_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42, "login": "ada", "name": "Ada Lovelace", "email": "ada@example.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let provider = GitHubProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        let profile = provider.fetch_profile(&token()).await.unwrap();

        assert_eq!(profile.external_id, "42");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.last_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn test_missing_email_falls_back_to_primary_verified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7, "login": "octo", "name": null, "email": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "email": "old@example.com", "primary": false, "verified": true },
                { "email": "unverified@example.com", "primary": true, "verified": false },
                { "email": "octo@example.com", "primary": true, "verified": true }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GitHubProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        let profile = provider.fetch_profile(&token()).await.unwrap();

        assert_eq!(profile.email.as_deref(), Some("octo@example.com"));
        assert_eq!(profile.first_name.as_deref(), Some("octo"));
    }

    #[tokio::test]
    async fn test_no_verified_primary_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7, "login": "octo"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "email": "x@example.com", "primary": true, "verified": false }
            ])))
            .mount(&server)
            .await;

        let provider = GitHubProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        assert!(provider.fetch_profile(&token()).await.unwrap().email.is_none());
    }
}
