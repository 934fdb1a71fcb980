//! Facebook 로그인 (Graph API)

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{AuthProvider, SocialProviderConfig};
use crate::core::errors::AppResult;
use crate::domain::models::social::{ExternalProfile, ExternalToken};
use crate::services::social::provider::{authorization_url, exchange_code_form, send_json, SocialProvider};

const FACEBOOK_SCOPE: &str = "email,public_profile";
const PROFILE_FIELDS: &str = "id,email,first_name,last_name";

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

pub struct FacebookProvider {
    config: SocialProviderConfig,
    http: reqwest::Client,
}

impl FacebookProvider {
    pub fn new(config: SocialProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl SocialProvider for FacebookProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::Facebook
    }

    fn auth_url(&self, state: &str) -> AppResult<String> {
        Ok(authorization_url(&self.config, FACEBOOK_SCOPE, state))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ExternalToken> {
        exchange_code_form(&self.http, &self.config, AuthProvider::Facebook, code).await
    }

    async fn fetch_profile(&self, token: &ExternalToken) -> AppResult<ExternalProfile> {
        let request = self.http
            .get(format!("{}/me", self.config.api_base))
            .query(&[("fields", PROFILE_FIELDS)])
            .bearer_auth(&token.access_token);
        let user: FacebookUser = send_json(request, AuthProvider::Facebook, "사용자 정보 조회").await?;

        Ok(ExternalProfile {
            external_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::social::provider::{http_client, test_config};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_profile_requests_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("fields", PROFILE_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "fb-1",
                "first_name": "Ada"
            })))
            .mount(&server)
            .await;

        let provider = FacebookProvider::new(test_config(&server.uri()), http_client(5).unwrap());
        let profile = provider
            .fetch_profile(&ExternalToken { access_token: "t".to_string() })
            .await
            .unwrap();

        assert_eq!(profile.external_id, "fb-1");
        assert!(profile.email.is_none());
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
    }
}
