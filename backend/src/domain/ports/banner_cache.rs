//! Port interface for the time-bounded banner content cache.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::banners::BannerContent;

use super::{BannerCacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by the caching adapter.
    pub enum BannerCacheError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "banner cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization { message: String } => "banner cache serialisation failed: {message}",
    }
}

/// Best-effort cache. Entries are never invalidated on write; staleness is
/// bounded by the TTL supplied to [`BannerCache::put`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BannerCache: Send + Sync {
    /// Read cached content for the given key.
    async fn get(&self, key: &BannerCacheKey) -> Result<Option<BannerContent>, BannerCacheError>;

    /// Store content under the key for `ttl`.
    async fn put(
        &self,
        key: &BannerCacheKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), BannerCacheError>;
}
