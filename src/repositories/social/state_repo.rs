//! 소셜 로그인 state 저장소
//!
//! 랜덤 state 값을 키로 [`PendingSocialLogin`]을 짧은 TTL로 보관하고,
//! 콜백에서 한 번 읽으면 즉시 무효화합니다.

use std::sync::Arc;

use async_trait::async_trait;

use crate::caching::redis::RedisClient;
use crate::core::errors::AppResult;
use crate::domain::models::social::PendingSocialLogin;

#[async_trait]
pub trait SocialStateStore: Send + Sync {
    async fn put(&self, state: &str, entry: &PendingSocialLogin) -> AppResult<()>;

    /// 엔트리를 꺼내고 삭제한다. 없거나 만료되었으면 `None`.
    async fn take(&self, state: &str, now: i64) -> AppResult<Option<PendingSocialLogin>>;
}

pub struct RedisSocialStateStore {
    redis: Arc<RedisClient>,
}

impl RedisSocialStateStore {
    const KEY_PREFIX: &'static str = "social_state:";

    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    fn key(state: &str) -> String {
        format!("{}{}", Self::KEY_PREFIX, state)
    }
}

#[async_trait]
impl SocialStateStore for RedisSocialStateStore {
    async fn put(&self, state: &str, entry: &PendingSocialLogin) -> AppResult<()> {
        let ttl = (entry.expires_at - entry.created_at).max(1) as u64;
        self.redis.set_with_expiry(&Self::key(state), entry, ttl).await?;
        Ok(())
    }

    async fn take(&self, state: &str, now: i64) -> AppResult<Option<PendingSocialLogin>> {
        let entry: Option<PendingSocialLogin> = self.redis.get_del(&Self::key(state)).await?;
        Ok(entry.filter(|e| !e.is_expired_at(now)))
    }
}
