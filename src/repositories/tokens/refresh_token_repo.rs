//! 리프레시 토큰 저장소
//!
//! 토큰 원문 대신 SHA-256 해시를 키로 저장합니다. 폐기는 `revoked=false`를 조건으로 한
//! 조건부 업데이트이므로, 회전(rotation) 중 같은 토큰으로 동시에 들어온 요청은
//! 하나만 `true`를 받습니다.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::core::errors::AppResult;
use crate::db::Database;
use crate::domain::entities::oauth::RefreshToken;
use crate::domain::models::tenant::TenantId;
use crate::repositories::scoped;

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: &RefreshToken) -> AppResult<()>;

    async fn find(&self, tenant: &TenantId, token_hash: &str) -> AppResult<Option<RefreshToken>>;

    /// 아직 폐기되지 않은 토큰을 폐기하면 `true`
    async fn revoke(&self, tenant: &TenantId, token_hash: &str, now: i64) -> AppResult<bool>;
}

pub struct MongoRefreshTokenRepository {
    db: Arc<Database>,
}

impl MongoRefreshTokenRepository {
    const COLLECTION: &'static str = "refresh_tokens";

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<RefreshToken> {
        self.db.get_database().collection(Self::COLLECTION)
    }

    pub async fn create_indexes(&self) -> AppResult<()> {
        let user_index = IndexModel::builder()
            .keys(doc! { "tenant_id": 1, "user_id": 1 })
            .options(IndexOptions::builder()
                .name("tenant_user".to_string())
                .build())
            .build();

        self.collection().create_indexes([user_index]).await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MongoRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> AppResult<()> {
        self.collection().insert_one(token).await?;
        Ok(())
    }

    async fn find(&self, tenant: &TenantId, token_hash: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.collection()
            .find_one(scoped(tenant, doc! { "_id": token_hash }))
            .await?)
    }

    async fn revoke(&self, tenant: &TenantId, token_hash: &str, now: i64) -> AppResult<bool> {
        let result = self.collection()
            .update_one(
                scoped(tenant, doc! { "_id": token_hash, "revoked": false }),
                doc! { "$set": { "revoked": true, "revoked_at": now } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }
}
