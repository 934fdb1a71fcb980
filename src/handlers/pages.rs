//! 브라우저용 HTML 페이지
//!
//! - 로그인 페이지: `GET /oauth/authorize`가 렌더링하며 `POST /oauth/authorize`로 제출됩니다.
//! - 직접 로그인 완료 페이지: `GET /auth/callback?code=..`. 같은 출처에서 `/oauth/token`을
//!   호출하므로 브라우저가 nonce 쿠키를 함께 보냅니다.
//!
//! 사용자 입력에서 온 값은 모두 `html_escape`로 이스케이프합니다.

use actix_web::{get, web, HttpResponse};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::AuthProvider;
use crate::core::errors::AppError;
use crate::domain::dto::oauth::AuthorizeParams;
use crate::domain::dto::social::DirectLoginQuery;
use crate::domain::entities::oauth::DIRECT_LOGIN_CLIENT_ID;
use crate::domain::models::tenant::TenantId;
use crate::services::social::SocialLoginBroker;

const SOCIAL_PROVIDERS: [AuthProvider; 3] = [AuthProvider::Google, AuthProvider::GitHub, AuthProvider::Facebook];

fn hidden(name: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            name,
            encode_double_quoted_attribute(value)
        ),
        None => String::new(),
    }
}

fn social_query(params: &AuthorizeParams) -> String {
    let pairs = [
        ("client_id", Some(params.client_id.as_str())),
        ("redirect_uri", Some(params.redirect_uri.as_str())),
        ("scope", params.scope.as_deref()),
        ("state", params.state.as_deref()),
        ("code_challenge", params.code_challenge.as_deref()),
        ("code_challenge_method", params.code_challenge_method.as_deref()),
    ];

    pairs
        .iter()
        .filter_map(|(k, v)| v.map(|v| format!("{}={}", k, urlencoding::encode(v))))
        .collect::<Vec<_>>()
        .join("&")
}

/// 로그인 폼. `two_factor_session_id`가 있으면 인증 코드 입력란을 함께 표시합니다.
pub fn login_page(
    tenant: &TenantId,
    params: &AuthorizeParams,
    two_factor_session_id: Option<&str>,
    error: Option<&str>,
) -> String {
    let prefix = tenant.path_prefix();

    let fields = [
        hidden("response_type", Some(params.response_type.as_deref().unwrap_or("code"))),
        hidden("client_id", Some(&params.client_id)),
        hidden("redirect_uri", Some(&params.redirect_uri)),
        hidden("scope", params.scope.as_deref()),
        hidden("state", params.state.as_deref()),
        hidden("code_challenge", params.code_challenge.as_deref()),
        hidden("code_challenge_method", params.code_challenge_method.as_deref()),
        hidden("two_factor_session_id", two_factor_session_id),
    ]
    .concat();

    let error_block = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, encode_text(e)))
        .unwrap_or_default();

    let code_field = if two_factor_session_id.is_some() {
        r#"<label>인증 코드 <input name="totp_code" autocomplete="one-time-code" inputmode="numeric" autofocus></label>"#
    } else {
        ""
    };

    let query = social_query(params);
    let social_links = SOCIAL_PROVIDERS
        .iter()
        .map(|p| {
            format!(
                r#"<a class="social" href="{}">{} 로그인</a>"#,
                encode_double_quoted_attribute(&format!("{}/auth/{}/oauth?{}", prefix, p.as_str(), query)),
                p.as_str()
            )
        })
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="utf-8"><title>로그인</title></head>
<body>
<main>
<h1>로그인</h1>
<p class="client">{client}</p>
{error_block}
<form method="post" action="{action}">
{fields}
<label>이메일 <input type="email" name="email" required></label>
<label>비밀번호 <input type="password" name="password" required></label>
{code_field}
<button type="submit">로그인</button>
</form>
<nav>{social_links}</nav>
</main>
</body>
</html>"#,
        client = encode_text(&params.client_id),
        action = encode_double_quoted_attribute(&format!("{}/oauth/authorize", prefix)),
    )
}

pub fn html(status: actix_web::http::StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .insert_header(("Cache-Control", "no-store"))
        .insert_header(("X-Frame-Options", "DENY"))
        .body(body)
}

/// 직접 로그인 완료 페이지
///
/// # Endpoint
/// `GET /auth/callback?code={code}`
#[get("/auth/callback")]
pub async fn direct_login_callback(
    tenant: TenantId,
    query: web::Query<DirectLoginQuery>,
) -> Result<HttpResponse, AppError> {
    if query.code.trim().is_empty() {
        return Err(AppError::ValidationError("code가 필요합니다".to_string()));
    }

    let broker = SocialLoginBroker::instance();
    let redirect_uri = broker.direct_login_redirect_uri(&tenant);
    let token_endpoint = format!("{}/oauth/token", tenant.path_prefix());

    let config = serde_json::json!({
        "token_endpoint": token_endpoint,
        "code": query.code,
        "client_id": DIRECT_LOGIN_CLIENT_ID,
        "redirect_uri": redirect_uri,
    });

    // JSON을 <script> 안에 넣으므로 `<`를 이스케이프한다
    let config = config.to_string().replace('<', "\\u003c");

    let body = format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="utf-8"><title>로그인 완료</title></head>
<body>
<p id="status">로그인 처리 중...</p>
<script>
(function () {{
  var cfg = {config};
  var form = new URLSearchParams();
  form.set("grant_type", "authorization_code");
  form.set("code", cfg.code);
  form.set("client_id", cfg.client_id);
  form.set("redirect_uri", cfg.redirect_uri);
  fetch(cfg.token_endpoint, {{
    method: "POST",
    credentials: "same-origin",
    headers: {{ "Content-Type": "application/x-www-form-urlencoded" }},
    body: form
  }}).then(function (res) {{
    return res.json().then(function (body) {{ return {{ ok: res.ok, body: body }}; }});
  }}).then(function (result) {{
    var status = document.getElementById("status");
    if (!result.ok) {{
      status.textContent = "로그인에 실패했습니다. 다시 시도해주세요.";
      return;
    }}
    sessionStorage.setItem("access_token", result.body.access_token);
    if (result.body.refresh_token) {{
      sessionStorage.setItem("refresh_token", result.body.refresh_token);
    }}
    status.textContent = "로그인되었습니다.";
  }});
}})();
</script>
</body>
</html>"#
    );

    Ok(html(actix_web::http::StatusCode::OK, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AuthorizeParams {
        AuthorizeParams {
            response_type: Some("code".to_string()),
            client_id: "spa".to_string(),
            redirect_uri: "https://app.example.com/cb?x=1&y=2".to_string(),
            scope: Some("openid email".to_string()),
            state: Some(r#""><script>alert(1)</script>"#.to_string()),
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    #[test]
    fn test_login_page_escapes_user_values() {
        let page = login_page(&TenantId::default_tenant(), &params(), None, Some("<b>bad</b>"));

        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;b&gt;bad&lt;/b&gt;"));
        assert!(page.contains(r#"action="/oauth/authorize""#));
        assert!(!page.contains("totp_code"));
    }

    #[test]
    fn test_login_page_for_tenant_with_two_factor_prompt() {
        let tenant = TenantId::parse("acme").unwrap();
        let page = login_page(&tenant, &params(), Some("sess-1"), None);

        assert!(page.contains(r#"action="/t/acme/oauth/authorize""#));
        assert!(page.contains(r#"name="two_factor_session_id" value="sess-1""#));
        assert!(page.contains("totp_code"));
        assert!(page.contains("/t/acme/auth/github/oauth?client_id=spa"));
    }
}
