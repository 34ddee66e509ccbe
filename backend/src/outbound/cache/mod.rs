//! Banner cache adapters.
//!
//! [`RedisBannerCache`] is the production adapter. [`StubBannerCache`]
//! always misses and is used when no Redis URL is configured, so every read
//! falls through to storage.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::banners::BannerContent;
use crate::domain::ports::{BannerCache, BannerCacheError, BannerCacheKey};

mod redis_cache;

pub use redis_cache::RedisBannerCache;

/// Cache implementation that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubBannerCache;

impl StubBannerCache {
    /// Create a cache that stores nothing.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BannerCache for StubBannerCache {
    async fn get(&self, _key: &BannerCacheKey) -> Result<Option<BannerContent>, BannerCacheError> {
        Ok(None)
    }

    async fn put(
        &self,
        _key: &BannerCacheKey,
        _content: &BannerContent,
        _ttl: Duration,
    ) -> Result<(), BannerCacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::banners::{FeatureId, TagId};

    fn key() -> BannerCacheKey {
        BannerCacheKey::new(
            FeatureId::new(1).expect("positive"),
            TagId::new(2).expect("positive"),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn stub_cache_misses_even_after_put() {
        let cache = StubBannerCache::new();
        cache
            .put(
                &key(),
                &BannerContent::new(json!({ "title": "x" })),
                Duration::from_secs(60),
            )
            .await
            .expect("put succeeds");

        let result = cache.get(&key()).await.expect("get succeeds");
        assert!(result.is_none(), "stub cache should always miss");
    }
}
