use std::future::{ready, Ready};

use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};

use crate::core::errors::AppError;
use crate::domain::models::tenant::TenantId;
use crate::domain::models::token::AccessTokenClaims;

/// Bearer 토큰 검증을 통과한 요청 주체
///
/// [`AuthMiddleware`](crate::middlewares::AuthMiddleware)가 request extensions에 넣고,
/// 핸들러는 추출자로 받습니다.
///
/// ```rust,ignore
/// #[post("/setup")]
/// async fn setup(user: AuthenticatedUser) -> AppResult<HttpResponse> { ... }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub tenant_id: TenantId,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub groups: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl From<AccessTokenClaims> for AuthenticatedUser {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            client_id: claims.client_id,
            scopes: claims.scopes,
            groups: claims.groups,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AppError::AuthenticationError("인증되지 않은 요청입니다".to_string()).into())),
        }
    }
}
