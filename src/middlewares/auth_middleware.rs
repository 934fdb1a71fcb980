//! Bearer 토큰 인증 미들웨어
//!
//! 요청의 테넌트로 액세스 토큰을 검증하고 [`AuthenticatedUser`](crate::domain::models::auth::AuthenticatedUser)를
//! request extensions에 저장합니다. 다른 테넌트에서 발급된 토큰은 거부됩니다.

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, Result,
    body::EitherBody,
};
use crate::domain::models::auth::RequiredScope;
use crate::middlewares::auth_inner::AuthMiddlewareService;

/// Bearer 인증 미들웨어
pub struct AuthMiddleware {
    /// 접근에 필요한 스코프 (선택사항)
    required_scope: Option<RequiredScope>,
}

impl AuthMiddleware {
    /// 유효한 토큰만 요구
    pub fn required() -> Self {
        Self { required_scope: None }
    }

    /// 특정 스코프를 함께 요구
    pub fn required_with_scope(scope: &str) -> Self {
        Self {
            required_scope: Some(RequiredScope(scope.to_string())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            required_scope: self.required_scope.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::{test, web, App, HttpResponse};

    use crate::domain::models::auth::AuthenticatedUser;
    use crate::domain::models::tenant::TenantId;
    use crate::domain::models::token::TokenSubject;
    use crate::services::auth::TokenService;

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "sub": user.user_id, "tenant": user.tenant_id }))
    }

    async fn issue(tenant: &str, scopes: &[&str]) -> String {
        crate::handlers::test_support::init_services();
        let tenant_id = if tenant.is_empty() { TenantId::default_tenant() } else { TenantId::parse(tenant).unwrap() };
        TokenService::instance()
            .issue_tokens(&TokenSubject {
                tenant_id,
                user_id: "u-1".to_string(),
                client_id: "spa".to_string(),
                email: Some("u@example.com".to_string()),
                given_name: None,
                family_name: None,
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
                groups: vec![],
            })
            .await
            .unwrap()
            .access_token
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let app = test::init_service(
            App::new().service(web::scope("/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_token_accepted_only_in_issuing_tenant() {
        let token = issue("acme", &["read"]).await;
        let app = test::init_service(
            App::new().service(
                web::scope("/t/{tenant}/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami)),
            ),
        )
        .await;

        let ok = test::TestRequest::get()
            .uri("/t/acme/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        assert_eq!(test::call_service(&app, ok).await.status(), 200);

        let other = test::TestRequest::get()
            .uri("/t/globex/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        assert_eq!(test::call_service(&app, other).await.status(), 401);
    }

    #[actix_web::test]
    async fn test_required_scope_is_enforced() {
        let token = issue("", &["read"]).await;
        let app = test::init_service(
            App::new().service(
                web::scope("/me").wrap(AuthMiddleware::required_with_scope("openid")).route("", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }
}
