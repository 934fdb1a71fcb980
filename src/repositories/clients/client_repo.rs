use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::core::errors::AppResult;
use crate::db::Database;
use crate::domain::entities::oauth::OAuthClient;
use crate::domain::models::tenant::TenantId;
use crate::repositories::scoped;

/// OAuth 클라이언트 조회. 등록/수정은 관리 API의 책임이다.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_by_client_id(&self, tenant: &TenantId, client_id: &str) -> AppResult<Option<OAuthClient>>;

    async fn insert(&self, client: OAuthClient) -> AppResult<()>;
}

pub struct MongoClientRepository {
    db: Arc<Database>,
}

impl MongoClientRepository {
    const COLLECTION: &'static str = "oauth_clients";

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<OAuthClient> {
        self.db.get_database().collection(Self::COLLECTION)
    }

    pub async fn create_indexes(&self) -> AppResult<()> {
        let client_id_index = IndexModel::builder()
            .keys(doc! { "tenant_id": 1, "client_id": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("tenant_client_id_unique".to_string())
                .build())
            .build();

        self.collection().create_indexes([client_id_index]).await?;
        Ok(())
    }
}

#[async_trait]
impl ClientStore for MongoClientRepository {
    async fn find_by_client_id(&self, tenant: &TenantId, client_id: &str) -> AppResult<Option<OAuthClient>> {
        Ok(self.collection()
            .find_one(scoped(tenant, doc! { "client_id": client_id }))
            .await?)
    }

    async fn insert(&self, client: OAuthClient) -> AppResult<()> {
        self.collection().insert_one(&client).await?;
        Ok(())
    }
}
