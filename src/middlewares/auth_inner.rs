//! AuthMiddleware 인증 로직의 핵심적인 기능
use std::rc::Rc;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpMessage, ResponseError};
use futures_util::future::LocalBoxFuture;
use crate::core::errors::{AppError, AppResult};
use crate::domain::models::auth::{AuthenticatedUser, RequiredScope};
use crate::domain::models::tenant::TenantId;
use crate::services::auth::TokenService;

/// 실제 인증 로직을 수행하는 서비스
pub struct AuthMiddlewareService<S> {
    pub service: Rc<S>,
    pub required_scope: Option<RequiredScope>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let required_scope = self.required_scope.clone();

        Box::pin(async move {
            let user = match authenticate(&req) {
                Ok(user) => user,
                Err(err) => {
                    log::warn!("인증 실패: {}", err);
                    let response = err.error_response();
                    let (req, _) = req.into_parts();
                    return Ok(ServiceResponse::new(req, response).map_into_right_body());
                }
            };

            if let Some(ref required) = required_scope {
                if !required.is_satisfied(&user.scopes) {
                    log::warn!("스코프 부족: 사용자 ID {} ({:?}), 필요 스코프: {:?}", user.user_id, user.scopes, required);
                    let response = AppError::AuthorizationError("필요한 스코프가 없습니다".to_string()).error_response();
                    let (req, _) = req.into_parts();
                    return Ok(ServiceResponse::new(req, response).map_into_right_body());
                }
            }

            log::debug!("인증 성공: 사용자 ID {}, tenant={}", user.user_id, user.tenant_id);
            req.extensions_mut().insert(user);

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// 요청의 테넌트를 해석하고 Bearer 토큰을 그 테넌트 기준으로 검증
fn authenticate(req: &ServiceRequest) -> AppResult<AuthenticatedUser> {
    let tenant = TenantId::resolve(req.request())?;

    let auth_header = req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::AuthenticationError("Authorization 헤더가 없습니다".to_string()))?;

    let token = TokenService::extract_bearer_token(auth_header)?;
    let claims = TokenService::instance().validate_access_token(token, &tenant)?;

    Ok(AuthenticatedUser::from(claims))
}
