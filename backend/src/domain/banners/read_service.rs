//! Read path: cache-aside resolution of banner content.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{
    BannerCache, BannerCacheKey, BannerQuery, BannerRepository, GetBannerRequest,
};

use super::service_support::map_repository_error;
use super::{Banner, BannerContent, BannerFilter};

/// Banner service implementing the query driving port.
#[derive(Clone)]
pub struct BannerReadService<R, C: ?Sized> {
    banner_repo: Arc<R>,
    cache: Arc<C>,
    cache_ttl: Duration,
}

impl<R, C: ?Sized> BannerReadService<R, C> {
    /// Create a read service; populated entries live for `cache_ttl`.
    pub fn new(banner_repo: Arc<R>, cache: Arc<C>, cache_ttl: Duration) -> Self {
        Self {
            banner_repo,
            cache,
            cache_ttl,
        }
    }
}

impl<R, C> BannerReadService<R, C>
where
    R: BannerRepository,
    C: BannerCache + ?Sized,
{
    async fn cached(&self, key: &BannerCacheKey) -> Option<BannerContent> {
        match self.cache.get(key).await {
            Ok(Some(content)) => {
                debug!(%key, "banner cache hit");
                Some(content)
            }
            Ok(None) => {
                debug!(%key, "banner cache miss");
                None
            }
            Err(error) => {
                debug!(%key, %error, "banner cache read failed; treating as miss");
                None
            }
        }
    }

    async fn populate(&self, key: &BannerCacheKey, content: &BannerContent) {
        if let Err(error) = self.cache.put(key, content, self.cache_ttl).await {
            warn!(%key, %error, "failed to populate banner cache");
        }
    }
}

#[async_trait]
impl<R, C> BannerQuery for BannerReadService<R, C>
where
    R: BannerRepository,
    C: BannerCache + ?Sized,
{
    async fn get_banner(&self, request: GetBannerRequest) -> Result<BannerContent, Error> {
        let key = BannerCacheKey::new(request.feature_id, request.tag_id);

        if !request.use_latest {
            if let Some(content) = self.cached(&key).await {
                return Ok(content);
            }
        }

        let active = self
            .banner_repo
            .find_active(request.feature_id, request.tag_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "no active banner for tag {} and feature {}",
                    request.tag_id, request.feature_id
                ))
            })?;
        debug!(banner_id = %active.banner_id, %key, "banner resolved from storage");

        if !request.use_latest {
            self.populate(&key, &active.content).await;
        }
        Ok(active.content)
    }

    async fn list_banners(&self, filter: BannerFilter) -> Result<Vec<Banner>, Error> {
        self.banner_repo
            .list(&filter)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "read_service_tests.rs"]
mod tests;
