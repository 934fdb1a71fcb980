//! Apple 로그인
//!
//! Apple은 클라이언트 인증에 ES256 서명 JWT(client secret)를 요구하므로 다른 제공자와
//! 구조가 다릅니다. 아직 구성되지 않았으며, 모든 단계가 명시적으로 실패합니다.

use async_trait::async_trait;

use crate::config::AuthProvider;
use crate::core::errors::{AppError, AppResult};
use crate::domain::models::social::{ExternalProfile, ExternalToken};
use crate::services::social::provider::SocialProvider;

pub struct AppleProvider;

#[async_trait]
impl SocialProvider for AppleProvider {
    fn kind(&self) -> AuthProvider {
        AuthProvider::Apple
    }

    fn auth_url(&self, _state: &str) -> AppResult<String> {
        Err(AppError::ConfigurationError("apple 로그인이 설정되지 않았습니다".to_string()))
    }

    async fn exchange_code(&self, _code: &str) -> AppResult<ExternalToken> {
        Err(AppError::NotImplemented("apple 토큰 교환은 지원되지 않습니다".to_string()))
    }

    async fn fetch_profile(&self, _token: &ExternalToken) -> AppResult<ExternalProfile> {
        Err(AppError::NotImplemented("apple 프로필 조회는 지원되지 않습니다".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apple_fails_fast() {
        let provider = AppleProvider;

        assert!(matches!(provider.auth_url("s"), Err(AppError::ConfigurationError(_))));
        assert!(matches!(provider.exchange_code("c").await, Err(AppError::NotImplemented(_))));
    }
}
