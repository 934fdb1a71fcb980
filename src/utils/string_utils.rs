//! 문자열 입력 정리 및 OAuth 스코프 문자열 처리 유틸리티
//!
//! HTML 폼과 쿼리스트링에서 들어오는 값은 빈 문자열과 누락을 구분하지 않으므로,
//! 공백만 있는 값은 `None`으로 정규화합니다.

use serde::Deserialize;

pub fn clean_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// `#[serde(deserialize_with = "deserialize_optional_string")]`용 역직렬화 함수
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(clean_optional_string(opt))
}

/// 공백으로 구분된 스코프 문자열을 순서를 유지한 채 중복 없이 분리합니다.
pub fn parse_scopes(scope: Option<&str>) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();

    for item in scope.unwrap_or_default().split_whitespace() {
        if !scopes.iter().any(|s| s == item) {
            scopes.push(item.to_string());
        }
    }

    scopes
}

pub fn join_scopes(scopes: &[String]) -> String {
    scopes.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_optional_string() {
        assert_eq!(clean_optional_string(Some("  S256 ".to_string())), Some("S256".to_string()));
        assert_eq!(clean_optional_string(Some("   ".to_string())), None);
        assert_eq!(clean_optional_string(None), None);
    }

    #[test]
    fn test_deserialize_optional_string() {
        #[derive(Deserialize)]
        struct Form {
            #[serde(default, deserialize_with = "deserialize_optional_string")]
            code_challenge: Option<String>,
        }

        let form: Form = serde_json::from_str(r#"{"code_challenge": ""}"#).unwrap();
        assert_eq!(form.code_challenge, None);

        let form: Form = serde_json::from_str(r#"{"code_challenge": " abc "}"#).unwrap();
        assert_eq!(form.code_challenge, Some("abc".to_string()));

        let form: Form = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(form.code_challenge, None);
    }

    #[test]
    fn test_parse_scopes_dedupes_and_keeps_order() {
        assert_eq!(
            parse_scopes(Some("openid  profile openid email")),
            vec!["openid", "profile", "email"]
        );
        assert!(parse_scopes(None).is_empty());
        assert!(parse_scopes(Some("   ")).is_empty());
    }

    #[test]
    fn test_join_scopes() {
        let scopes = vec!["read".to_string(), "openid".to_string()];
        assert_eq!(join_scopes(&scopes), "read openid");
    }
}
