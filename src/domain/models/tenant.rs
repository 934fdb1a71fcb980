//! 테넌트 식별자와 요청별 테넌트 해석
//!
//! 모든 저장 엔티티와 조회는 테넌트로 분할됩니다. 빈 식별자는
//! 테넌트 도입 이전 데이터와의 호환을 위한 "레거시 기본 테넌트"를 의미합니다.
//!
//! ## 해석 순서
//!
//! 1. 경로 세그먼트 `/t/{tenant}/...`
//! 2. `X-Tenant-ID` 헤더
//! 3. `TENANT_BASE_DOMAIN`이 설정된 경우 Host 헤더의 서브도메인 (`acme.auth.example.com`)
//! 4. 레거시 기본 테넌트

use std::fmt;
use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::TenantConfig;
use crate::core::errors::{AppError, AppResult};

pub const TENANT_HEADER: &str = "X-Tenant-ID";
const MAX_TENANT_LEN: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// 레거시 기본 테넌트
    pub fn default_tenant() -> Self {
        Self(String::new())
    }

    /// 외부 입력을 검증합니다. 빈 값은 기본 테넌트, 그 외에는 `[a-z0-9_-]{1,64}`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let value = raw.trim().to_lowercase();

        if value.is_empty() {
            return Ok(Self::default_tenant());
        }

        let valid = value.len() <= MAX_TENANT_LEN
            && value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

        if !valid {
            return Err(AppError::ValidationError("유효하지 않은 테넌트 식별자입니다".to_string()));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// 테넌트 범위 URL 접두사. 기본 테넌트는 빈 문자열.
    pub fn path_prefix(&self) -> String {
        if self.is_default() {
            String::new()
        } else {
            format!("/t/{}", self.0)
        }
    }

    pub fn resolve(req: &HttpRequest) -> AppResult<Self> {
        let host = req.connection_info().host().to_string();

        Self::resolve_from_parts(
            req.match_info().get("tenant"),
            req.headers().get(TENANT_HEADER).and_then(|h| h.to_str().ok()),
            Some(host.as_str()),
            TenantConfig::base_domain().as_deref(),
        )
    }

    pub fn resolve_from_parts(
        path_segment: Option<&str>,
        header: Option<&str>,
        host: Option<&str>,
        base_domain: Option<&str>,
    ) -> AppResult<Self> {
        if let Some(segment) = path_segment {
            return Self::parse(segment);
        }

        if let Some(value) = header.filter(|v| !v.trim().is_empty()) {
            return Self::parse(value);
        }

        if let (Some(host), Some(base)) = (host, base_domain) {
            let host = host.split(':').next().unwrap_or(host).to_lowercase();
            if let Some(sub) = host.strip_suffix(&format!(".{}", base)) {
                if !sub.is_empty() && !sub.contains('.') {
                    return Self::parse(sub);
                }
            }
        }

        Ok(Self::default_tenant())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "(default)")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// 저장된 문서에서 `tenant_id`가 없거나 null이면 기본 테넌트로 읽는다.
impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
    }
}

impl FromRequest for TenantId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Self::resolve(req).map_err(actix_web::Error::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_empty_is_default_tenant() {
        let tenant = TenantId::parse("  ").unwrap();
        assert!(tenant.is_default());
        assert_eq!(tenant.path_prefix(), "");
    }

    #[test]
    fn test_parse_normalizes_and_validates() {
        assert_eq!(TenantId::parse("Acme-01").unwrap().as_str(), "acme-01");
        assert!(TenantId::parse("acme/../other").is_err());
        assert!(TenantId::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_path_segment_wins_over_header_and_host() {
        let tenant = TenantId::resolve_from_parts(
            Some("acme"),
            Some("globex"),
            Some("initech.auth.example.com"),
            Some("auth.example.com"),
        )
        .unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn test_host_subdomain_resolution() {
        let tenant = TenantId::resolve_from_parts(None, None, Some("initech.auth.example.com:8443"), Some("auth.example.com")).unwrap();
        assert_eq!(tenant.as_str(), "initech");

        let nested = TenantId::resolve_from_parts(None, None, Some("a.b.auth.example.com"), Some("auth.example.com")).unwrap();
        assert!(nested.is_default());

        let no_base = TenantId::resolve_from_parts(None, None, Some("initech.auth.example.com"), None).unwrap();
        assert!(no_base.is_default());
    }

    #[test]
    fn test_missing_or_null_stored_tenant_is_default() {
        #[derive(Deserialize)]
        struct Doc {
            #[serde(default)]
            tenant_id: TenantId,
        }

        let missing: Doc = serde_json::from_str("{}").unwrap();
        let null: Doc = serde_json::from_str(r#"{"tenant_id": null}"#).unwrap();
        assert!(missing.tenant_id.is_default());
        assert!(null.tenant_id.is_default());
    }

    #[test]
    fn test_extract_from_header() {
        let req = TestRequest::default()
            .insert_header((TENANT_HEADER, "globex"))
            .to_http_request();
        assert_eq!(TenantId::resolve(&req).unwrap().as_str(), "globex");
    }
}
