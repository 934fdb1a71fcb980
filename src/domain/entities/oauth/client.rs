use serde::{Deserialize, Serialize};

use crate::domain::models::tenant::TenantId;

/// OAuth 클라이언트 (애플리케이션) 등록 정보
///
/// 관리 API 범위 밖에서 등록되며, 인가 서버는 읽기 전용으로 조회합니다.
/// `client_secret_hash`가 없는 클라이언트는 공개 클라이언트로 PKCE가 필수입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub tenant_id: TenantId,

    pub client_id: String,
    pub name: String,

    #[serde(default)]
    pub client_secret_hash: Option<String>,

    pub redirect_uris: Vec<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl OAuthClient {
    /// 등록된 redirect URI와 바이트 단위로 정확히 일치해야 한다.
    pub fn is_redirect_uri_registered(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == redirect_uri)
    }

    pub fn is_confidential(&self) -> bool {
        self.client_secret_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient {
            id: "c1".to_string(),
            tenant_id: TenantId::default_tenant(),
            client_id: "web".to_string(),
            name: "Web".to_string(),
            client_secret_hash: None,
            redirect_uris: vec!["https://app.example.com/cb".to_string()],
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = client();
        assert!(client.is_redirect_uri_registered("https://app.example.com/cb"));
        assert!(!client.is_redirect_uri_registered("https://app.example.com/cb/"));
        assert!(!client.is_redirect_uri_registered("https://app.example.com/cb?x=1"));
        assert!(!client.is_confidential());
    }
}
