//! 사용자 저장소
//!
//! 2FA 상태 변경은 모두 단일 문서 조건부 업데이트로 수행합니다.
//! 특히 백업 코드 소비는 "해당 해시가 배열에 있을 때만 `$pull`"이라는 하나의
//! 연산이므로, 같은 코드로 동시에 들어온 요청 중 하나만 성공합니다.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{doc, to_bson};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};

use crate::core::errors::{AppError, AppResult, ErrorContext};
use crate::db::Database;
use crate::domain::entities::users::{TwoFactorEnrollment, User};
use crate::domain::models::tenant::TenantId;
use crate::repositories::{is_duplicate_key_error, scoped};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, tenant: &TenantId, user_id: &str) -> AppResult<Option<User>>;

    async fn find_by_email(&self, tenant: &TenantId, email: &str) -> AppResult<Option<User>>;

    /// 같은 테넌트에 같은 이메일이 있으면 `ConflictError`
    async fn create(&self, user: User) -> AppResult<User>;

    /// 2FA가 활성화되지 않은 사용자에게 대기 중 등록 정보를 기록한다.
    async fn begin_two_factor(&self, tenant: &TenantId, user_id: &str, enrollment: TwoFactorEnrollment, now: i64) -> AppResult<bool>;

    /// 대기 중 비밀키가 `secret`과 같을 때만 `enabled=true`로 전환한다.
    async fn activate_two_factor(&self, tenant: &TenantId, user_id: &str, secret: &str, now: i64) -> AppResult<Option<User>>;

    /// 백업 코드 해시가 존재하면 제거하고 `true`. 조건 검사와 제거는 하나의 연산이다.
    async fn consume_backup_code(&self, tenant: &TenantId, user_id: &str, code_hash: &str, now: i64) -> AppResult<bool>;

    async fn clear_two_factor(&self, tenant: &TenantId, user_id: &str, now: i64) -> AppResult<bool>;
}

pub struct MongoUserRepository {
    db: Arc<Database>,
}

impl MongoUserRepository {
    const COLLECTION: &'static str = "users";

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<User> {
        self.db.get_database().collection(Self::COLLECTION)
    }

    pub async fn create_indexes(&self) -> AppResult<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { "tenant_id": 1, "email": 1 })
            .options(IndexOptions::builder()
                .unique(true)
                .name("tenant_email_unique".to_string())
                .build())
            .build();

        self.collection().create_indexes([email_index]).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserRepository {
    async fn find_by_id(&self, tenant: &TenantId, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.collection()
            .find_one(scoped(tenant, doc! { "_id": user_id }))
            .await?)
    }

    async fn find_by_email(&self, tenant: &TenantId, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();

        Ok(self.collection()
            .find_one(scoped(tenant, doc! { "email": email }))
            .await?)
    }

    async fn create(&self, user: User) -> AppResult<User> {
        if self.find_by_email(&user.tenant_id, &user.email).await?.is_some() {
            return Err(AppError::ConflictError("이미 사용 중인 이메일입니다".to_string()));
        }

        match self.collection().insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key_error(&e) => {
                Err(AppError::ConflictError("이미 사용 중인 이메일입니다".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn begin_two_factor(&self, tenant: &TenantId, user_id: &str, enrollment: TwoFactorEnrollment, now: i64) -> AppResult<bool> {
        let enrollment = to_bson(&enrollment)
            .context("2FA 정보 직렬화 실패")?;

        let result = self.collection()
            .update_one(
                scoped(tenant, doc! { "_id": user_id, "two_factor.enabled": { "$ne": true } }),
                doc! { "$set": { "two_factor": enrollment, "updated_at": now } },
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn activate_two_factor(&self, tenant: &TenantId, user_id: &str, secret: &str, now: i64) -> AppResult<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self.collection()
            .find_one_and_update(
                scoped(tenant, doc! {
                    "_id": user_id,
                    "two_factor.enabled": { "$ne": true },
                    "two_factor.secret": secret,
                }),
                doc! { "$set": { "two_factor.enabled": true, "updated_at": now } },
            )
            .with_options(options)
            .await?)
    }

    async fn consume_backup_code(&self, tenant: &TenantId, user_id: &str, code_hash: &str, now: i64) -> AppResult<bool> {
        let result = self.collection()
            .update_one(
                scoped(tenant, doc! {
                    "_id": user_id,
                    "two_factor.enabled": true,
                    "two_factor.backup_codes": code_hash,
                }),
                doc! {
                    "$pull": { "two_factor.backup_codes": code_hash },
                    "$set": { "updated_at": now },
                },
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn clear_two_factor(&self, tenant: &TenantId, user_id: &str, now: i64) -> AppResult<bool> {
        let cleared = to_bson(&TwoFactorEnrollment::default())
            .context("2FA 정보 직렬화 실패")?;

        let result = self.collection()
            .update_one(
                scoped(tenant, doc! { "_id": user_id }),
                doc! { "$set": { "two_factor": cleared, "updated_at": now } },
            )
            .await?;

        Ok(result.matched_count == 1)
    }
}
