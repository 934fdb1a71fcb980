//! 인가 코드 저장소
//!
//! [`AuthorizationCodeStore::consume`]는 "미사용 + 미만료 + client/redirect 일치"를
//! 조건으로 `used=true`를 기록하는 단일 compare-and-swap입니다. 조건을 만족하는
//! 문서가 없으면 `None`이며, 동시에 두 요청이 같은 코드를 상환해도 하나만 문서를 받습니다.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};

use crate::core::errors::AppResult;
use crate::db::Database;
use crate::domain::entities::oauth::AuthorizationCode;
use crate::domain::models::tenant::TenantId;
use crate::repositories::scoped;

#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    async fn insert(&self, code: &AuthorizationCode) -> AppResult<()>;

    async fn consume(
        &self,
        tenant: &TenantId,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: i64,
    ) -> AppResult<Option<AuthorizationCode>>;
}

pub struct MongoAuthorizationCodeRepository {
    db: Arc<Database>,
}

impl MongoAuthorizationCodeRepository {
    const COLLECTION: &'static str = "authorization_codes";

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<AuthorizationCode> {
        self.db.get_database().collection(Self::COLLECTION)
    }

    pub async fn create_indexes(&self) -> AppResult<()> {
        let expiry_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(IndexOptions::builder()
                .name("expires_at".to_string())
                .build())
            .build();

        self.collection().create_indexes([expiry_index]).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MongoAuthorizationCodeRepository {
    async fn insert(&self, code: &AuthorizationCode) -> AppResult<()> {
        self.collection().insert_one(code).await?;
        Ok(())
    }

    async fn consume(
        &self,
        tenant: &TenantId,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        now: i64,
    ) -> AppResult<Option<AuthorizationCode>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self.collection()
            .find_one_and_update(
                scoped(tenant, doc! {
                    "_id": code,
                    "client_id": client_id,
                    "redirect_uri": redirect_uri,
                    "used": false,
                    "expires_at": { "$gt": now },
                }),
                doc! { "$set": { "used": true, "used_at": now } },
            )
            .with_options(options)
            .await?)
    }
}
