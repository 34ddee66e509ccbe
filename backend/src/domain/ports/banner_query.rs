//! Driving port for banner reads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::banners::{Banner, BannerContent, BannerFilter, FeatureId, TagId};

/// Request for the content served to a (tag, feature) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBannerRequest {
    pub tag_id: TagId,
    pub feature_id: FeatureId,
    /// Bypass the cache and read authoritative state.
    #[serde(default)]
    pub use_latest: bool,
}

/// Driving port for banner read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BannerQuery: Send + Sync {
    /// Content of the active banner for the pair.
    ///
    /// Without `use_latest` the result may lag the live revision by up to
    /// the cache TTL.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use banner_service::domain::banners::{FeatureId, TagId};
    /// # use banner_service::domain::ports::{BannerQuery, GetBannerRequest};
    /// # async fn example(query: &dyn BannerQuery) -> Result<(), banner_service::domain::Error> {
    /// let content = query
    ///     .get_banner(GetBannerRequest {
    ///         tag_id: TagId::new(1).expect("positive"),
    ///         feature_id: FeatureId::new(2).expect("positive"),
    ///         use_latest: true,
    ///     })
    ///     .await?;
    /// println!("{}", content.as_value());
    /// # Ok(())
    /// # }
    /// ```
    async fn get_banner(&self, request: GetBannerRequest) -> Result<BannerContent, Error>;

    /// Banners matching the filter, ordered by id. Never cached.
    async fn list_banners(&self, filter: BannerFilter) -> Result<Vec<Banner>, Error>;
}
