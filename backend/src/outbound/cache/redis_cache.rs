//! Redis-backed banner cache.
//!
//! Content is stored as its JSON text under the rendered
//! [`BannerCacheKey`] with a server-side expiry, so stale entries age out
//! without any invalidation traffic.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::AsyncCommands;
use tracing::debug;

use crate::domain::banners::BannerContent;
use crate::domain::ports::{BannerCache, BannerCacheError, BannerCacheKey};

/// Cache adapter over a pooled Redis connection.
#[derive(Clone)]
pub struct RedisBannerCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisBannerCache {
    /// Build a pool for `redis_url`.
    ///
    /// The pool connects lazily; an unreachable server surfaces as a
    /// backend error on first use rather than here.
    pub async fn connect(redis_url: &str) -> Result<Self, BannerCacheError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|err| BannerCacheError::backend(err.to_string()))?;
        let pool = Pool::builder()
            .connection_timeout(Duration::from_secs(2))
            .build_unchecked(manager);
        Ok(Self { pool })
    }
}

/// Redis rejects a zero expiry, so sub-second TTLs round up.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl BannerCache for RedisBannerCache {
    async fn get(&self, key: &BannerCacheKey) -> Result<Option<BannerContent>, BannerCacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| BannerCacheError::backend(err.to_string()))?;
        let raw: Option<String> = conn
            .get(key.to_string())
            .await
            .map_err(|err| BannerCacheError::backend(err.to_string()))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        BannerContent::from_json_str(&raw)
            .map(Some)
            .map_err(|err| BannerCacheError::serialization(err.to_string()))
    }

    async fn put(
        &self,
        key: &BannerCacheKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), BannerCacheError> {
        let raw = content
            .to_json_string()
            .map_err(|err| BannerCacheError::serialization(err.to_string()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| BannerCacheError::backend(err.to_string()))?;
        let seconds = ttl_seconds(ttl);
        let () = conn
            .set_ex(key.to_string(), raw, seconds)
            .await
            .map_err(|err| BannerCacheError::backend(err.to_string()))?;
        debug!(%key, seconds, "banner content cached");
        Ok(())
    }
}
