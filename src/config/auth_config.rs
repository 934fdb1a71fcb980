//! 인증/인가 관련 설정
//!
//! 모든 값은 환경 변수에서 필요할 때마다 읽습니다. 서비스는 생성 시점에
//! 한 번 읽어 자신의 설정 구조체에 보관하고, 외부 제공자 자격 증명은
//! 해당 제공자를 처음 사용할 때 로드되어 누락 시 즉시 실패합니다.
//!
//! | 환경 변수 | 기본값 |
//! |-----------|--------|
//! | `JWT_SECRET` | 개발용 고정값 (경고 로그) |
//! | `JWT_KEY_ID` | `default` |
//! | `ACCESS_TOKEN_EXPIRATION_MINUTES` | 15 |
//! | `REFRESH_TOKEN_EXPIRATION_DAYS` | 30 |
//! | `AUTH_CODE_TTL_MINUTES` | 10 |
//! | `TOTP_ISSUER` | `OAuth Server` |
//! | `TWO_FACTOR_SESSION_TTL_MINUTES` | 5 |
//! | `TWO_FACTOR_BACKUP_CODE_COUNT` | 10 |
//! | `SOCIAL_STATE_TTL_MINUTES` | 10 |
//! | `SOCIAL_HTTP_TIMEOUT_SECS` | 10 |
//! | `{GOOGLE,GITHUB,FACEBOOK}_CLIENT_ID` / `_CLIENT_SECRET` | 없음 (사용 시 설정 오류) |

use std::env;
use std::str::FromStr;

use crate::config::data_config::IssuerConfig;
use crate::core::errors::AppError;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub struct JwtConfig;

impl JwtConfig {
    pub fn secret() -> String {
        env::var("JWT_SECRET")
            .unwrap_or_else(|_| {
                log::warn!("JWT_SECRET not set, using default (not secure for production!)");
                "development-only-signing-secret".to_string()
            })
    }

    pub fn key_id() -> String {
        env::var("JWT_KEY_ID").unwrap_or_else(|_| "default".to_string())
    }

    pub fn access_token_minutes() -> i64 {
        env_or("ACCESS_TOKEN_EXPIRATION_MINUTES", 15)
    }

    pub fn refresh_token_days() -> i64 {
        env_or("REFRESH_TOKEN_EXPIRATION_DAYS", 30)
    }
}

pub struct AuthCodeConfig;

impl AuthCodeConfig {
    pub fn ttl_minutes() -> i64 {
        env_or("AUTH_CODE_TTL_MINUTES", 10)
    }
}

pub struct TwoFactorConfig;

impl TwoFactorConfig {
    /// otpauth URI의 issuer. `:`는 라벨 구분자이므로 제거한다.
    pub fn issuer() -> String {
        env::var("TOTP_ISSUER")
            .unwrap_or_else(|_| "OAuth Server".to_string())
            .replace(':', "")
    }

    pub fn session_ttl_minutes() -> i64 {
        env_or("TWO_FACTOR_SESSION_TTL_MINUTES", 5)
    }

    pub fn backup_code_count() -> usize {
        env_or("TWO_FACTOR_BACKUP_CODE_COUNT", 10)
    }
}

pub struct SocialConfig;

impl SocialConfig {
    pub fn state_ttl_minutes() -> i64 {
        env_or("SOCIAL_STATE_TTL_MINUTES", 10)
    }

    pub fn http_timeout_secs() -> u64 {
        env_or("SOCIAL_HTTP_TIMEOUT_SECS", 10)
    }
}

/// 외부 로그인 제공자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
    GitHub,
    Facebook,
    Apple,
}

impl AuthProvider {
    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "github" => Ok(AuthProvider::GitHub),
            "facebook" => Ok(AuthProvider::Facebook),
            "apple" => Ok(AuthProvider::Apple),
            _ => Err(AppError::NotFound(format!("지원하지 않는 로그인 제공자입니다: {}", s))),
        }
    }

    /// 소셜 로그인 경로에서 쓰이는 제공자. `local`은 거부한다.
    pub fn social_from_str(s: &str) -> Result<Self, AppError> {
        match Self::from_str(s)? {
            AuthProvider::Local => Err(AppError::NotFound(format!("지원하지 않는 로그인 제공자입니다: {}", s))),
            provider => Ok(provider),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::GitHub => "github",
            AuthProvider::Facebook => "facebook",
            AuthProvider::Apple => "apple",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            AuthProvider::Local => "LOCAL",
            AuthProvider::Google => "GOOGLE",
            AuthProvider::GitHub => "GITHUB",
            AuthProvider::Facebook => "FACEBOOK",
            AuthProvider::Apple => "APPLE",
        }
    }
}

/// 외부 제공자 하나의 자격 증명과 엔드포인트
#[derive(Debug, Clone)]
pub struct SocialProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    /// 프로필 API 기본 URL (Google userinfo, GitHub API, Facebook Graph)
    pub api_base: String,
}

impl SocialProviderConfig {
    /// `{PREFIX}_CLIENT_ID`, `{PREFIX}_CLIENT_SECRET`가 없으면 설정 오류.
    pub fn load(provider: AuthProvider) -> Result<Self, AppError> {
        let prefix = provider.env_prefix();
        let (auth_url, token_url, api_base) = Self::default_endpoints(provider)?;

        let required = |name: &str| {
            let key = format!("{}_{}", prefix, name);
            env::var(&key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    AppError::ConfigurationError(format!("{} 로그인이 설정되지 않았습니다 ({} 누락)", provider.as_str(), key))
                })
        };
        let optional = |name: &str, default: &str| {
            env::var(format!("{}_{}", prefix, name)).unwrap_or_else(|_| default.to_string())
        };

        let default_redirect = format!("{}/auth/{}/callback", IssuerConfig::base_url(), provider.as_str());

        Ok(Self {
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            redirect_uri: optional("REDIRECT_URI", &default_redirect),
            auth_url: optional("AUTH_URL", auth_url),
            token_url: optional("TOKEN_URL", token_url),
            api_base: optional("API_BASE", api_base),
        })
    }

    fn default_endpoints(provider: AuthProvider) -> Result<(&'static str, &'static str, &'static str), AppError> {
        match provider {
            AuthProvider::Google => Ok((
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://openidconnect.googleapis.com",
            )),
            AuthProvider::GitHub => Ok((
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com",
            )),
            AuthProvider::Facebook => Ok((
                "https://www.facebook.com/v18.0/dialog/oauth",
                "https://graph.facebook.com/v18.0/oauth/access_token",
                "https://graph.facebook.com/v18.0",
            )),
            AuthProvider::Apple | AuthProvider::Local => Err(AppError::ConfigurationError(format!(
                "{} 로그인이 설정되지 않았습니다",
                provider.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_provider_from_string() {
        assert_eq!(AuthProvider::from_str("google").unwrap(), AuthProvider::Google);
        assert_eq!(AuthProvider::from_str("GitHub").unwrap(), AuthProvider::GitHub);
        assert_eq!(AuthProvider::from_str("FACEBOOK").unwrap(), AuthProvider::Facebook);
        assert_eq!(AuthProvider::from_str("apple").unwrap(), AuthProvider::Apple);
        assert!(AuthProvider::from_str("twitter").is_err());
    }

    #[test]
    fn test_social_from_str_rejects_local() {
        assert!(AuthProvider::social_from_str("local").is_err());
        assert_eq!(AuthProvider::social_from_str("github").unwrap(), AuthProvider::GitHub);
    }

    #[test]
    fn test_auth_provider_roundtrip() {
        for name in ["local", "google", "github", "facebook", "apple"] {
            assert_eq!(AuthProvider::from_str(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_auth_provider_serialization() {
        let json = serde_json::to_string(&AuthProvider::GitHub).unwrap();
        assert_eq!(json, "\"github\"");
        let back: AuthProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AuthProvider::GitHub);
    }

    #[test]
    fn test_apple_has_no_endpoints() {
        let result = SocialProviderConfig::load(AuthProvider::Apple);
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }
}
