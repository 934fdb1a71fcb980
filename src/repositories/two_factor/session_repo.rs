use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::Collection;

use crate::core::errors::AppResult;
use crate::db::Database;
use crate::domain::entities::two_factor::{TwoFactorSession, MAX_SESSION_ATTEMPTS};
use crate::domain::models::tenant::TenantId;
use crate::repositories::scoped;

/// 2FA step-up 세션 저장소
#[async_trait]
pub trait TwoFactorSessionStore: Send + Sync {
    async fn insert(&self, session: &TwoFactorSession) -> AppResult<()>;

    async fn find(&self, tenant: &TenantId, session_id: &str) -> AppResult<Option<TwoFactorSession>>;

    /// 만료 전이고 아직 미검증이며 잠기지 않은 세션을 검증 상태로 바꾸면 `true`
    async fn mark_verified(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool>;

    /// 검증 가능한 세션의 실패 횟수를 하나 올리면 `true`
    async fn record_failure(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool>;
}

pub struct MongoTwoFactorSessionRepository {
    db: Arc<Database>,
}

impl MongoTwoFactorSessionRepository {
    const COLLECTION: &'static str = "two_factor_sessions";

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<TwoFactorSession> {
        self.db.get_database().collection(Self::COLLECTION)
    }
}

#[async_trait]
impl TwoFactorSessionStore for MongoTwoFactorSessionRepository {
    async fn insert(&self, session: &TwoFactorSession) -> AppResult<()> {
        self.collection().insert_one(session).await?;
        Ok(())
    }

    async fn find(&self, tenant: &TenantId, session_id: &str) -> AppResult<Option<TwoFactorSession>> {
        Ok(self.collection()
            .find_one(scoped(tenant, doc! { "_id": session_id }))
            .await?)
    }

    async fn mark_verified(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool> {
        let result = self.collection()
            .update_one(
                scoped(tenant, doc! {
                    "_id": session_id,
                    "verified": false,
                    "failed_attempts": { "$lt": MAX_SESSION_ATTEMPTS },
                    "expires_at": { "$gt": now },
                }),
                doc! { "$set": { "verified": true, "verified_at": now } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn record_failure(&self, tenant: &TenantId, session_id: &str, now: i64) -> AppResult<bool> {
        let result = self.collection()
            .update_one(
                scoped(tenant, doc! {
                    "_id": session_id,
                    "verified": false,
                    "failed_attempts": { "$lt": MAX_SESSION_ATTEMPTS },
                    "expires_at": { "$gt": now },
                }),
                doc! { "$inc": { "failed_attempts": 1 } },
            )
            .await?;

        Ok(result.modified_count == 1)
    }
}
