//! 저장소 계층
//!
//! 각 저장소는 트레이트로 정의되고, MongoDB/Redis 구현과 인메모리 구현을 가집니다.
//! 서비스는 트레이트 객체(`Arc<dyn ...>`)만 알고 있으므로 테스트에서는
//! [`Repositories::in_memory`]를 주입합니다.
//!
//! ## 테넌트 필터
//!
//! 모든 MongoDB 조회 필터는 [`scoped`]를 거쳐 `tenant_id` 조건을 포함합니다.
//! 기본 테넌트는 `tenant_id`가 빈 문자열이거나 없는(레거시) 문서와 일치합니다.

pub mod clients;
pub mod codes;
pub mod memory;
pub mod social;
pub mod tokens;
pub mod two_factor;
pub mod users;

use std::sync::Arc;

use mongodb::bson::{doc, Bson, Document};

use crate::caching::redis::RedisClient;
use crate::core::errors::AppResult;
use crate::db::Database;
use crate::domain::models::tenant::TenantId;

use clients::{ClientStore, MongoClientRepository};
use codes::{AuthorizationCodeStore, MongoAuthorizationCodeRepository};
use memory::{
    InMemoryAuthorizationCodeStore, InMemoryClientStore, InMemoryRefreshTokenStore, InMemorySocialStateStore,
    InMemoryTwoFactorSessionStore, InMemoryUserStore,
};
use social::{RedisSocialStateStore, SocialStateStore};
use tokens::{MongoRefreshTokenRepository, RefreshTokenStore};
use two_factor::{MongoTwoFactorSessionRepository, TwoFactorSessionStore};
use users::{MongoUserRepository, UserStore};

/// 테넌트 조건만 담은 필터
pub fn tenant_filter(tenant: &TenantId) -> Document {
    if tenant.is_default() {
        doc! { "tenant_id": { "$in": [Bson::Null, ""] } }
    } else {
        doc! { "tenant_id": tenant.as_str() }
    }
}

/// 주어진 필터에 테넌트 조건을 더한다.
pub fn scoped(tenant: &TenantId, mut filter: Document) -> Document {
    for (key, value) in tenant_filter(tenant) {
        filter.insert(key, value);
    }
    filter
}

pub(crate) fn is_duplicate_key_error(error: &mongodb::error::Error) -> bool {
    error.to_string().contains("E11000")
}

/// 서비스들이 공유하는 저장소 묶음. `ServiceLocator`에 등록된다.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserStore>,
    pub clients: Arc<dyn ClientStore>,
    pub codes: Arc<dyn AuthorizationCodeStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub two_factor_sessions: Arc<dyn TwoFactorSessionStore>,
    pub social_states: Arc<dyn SocialStateStore>,
}

impl Repositories {
    /// MongoDB + Redis 구현. 인덱스를 보장한 뒤 반환한다.
    pub async fn mongo(db: Arc<Database>, redis: Arc<RedisClient>) -> AppResult<Self> {
        let users = MongoUserRepository::new(db.clone());
        let clients = MongoClientRepository::new(db.clone());
        let codes = MongoAuthorizationCodeRepository::new(db.clone());
        let refresh_tokens = MongoRefreshTokenRepository::new(db.clone());

        users.create_indexes().await?;
        clients.create_indexes().await?;
        codes.create_indexes().await?;
        refresh_tokens.create_indexes().await?;
        log::info!("✅ MongoDB 인덱스 확인 완료");

        Ok(Self {
            users: Arc::new(users),
            clients: Arc::new(clients),
            codes: Arc::new(codes),
            refresh_tokens: Arc::new(refresh_tokens),
            two_factor_sessions: Arc::new(MongoTwoFactorSessionRepository::new(db)),
            social_states: Arc::new(RedisSocialStateStore::new(redis)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            clients: Arc::new(InMemoryClientStore::new()),
            codes: Arc::new(InMemoryAuthorizationCodeStore::new()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenStore::new()),
            two_factor_sessions: Arc::new(InMemoryTwoFactorSessionStore::new()),
            social_states: Arc::new(InMemorySocialStateStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tenant_filter_matches_legacy_documents() {
        let filter = tenant_filter(&TenantId::default_tenant());
        let values = filter.get_document("tenant_id").unwrap().get_array("$in").unwrap();

        assert_eq!(values.len(), 2);
        assert!(values.contains(&Bson::Null));
        assert!(values.contains(&Bson::String(String::new())));
    }

    #[test]
    fn test_scoped_adds_named_tenant() {
        let filter = scoped(&TenantId::parse("acme").unwrap(), doc! { "_id": "abc" });

        assert_eq!(filter.get_str("_id").unwrap(), "abc");
        assert_eq!(filter.get_str("tenant_id").unwrap(), "acme");
    }
}
