//! Cache key addressing the content served for a (feature, tag) pair.

use std::fmt;

use crate::domain::banners::{FeatureId, TagId};

/// Cache key for banner content.
///
/// Renders as `banner:{feature}:{tag}` so entries share a namespace with
/// nothing else in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BannerCacheKey {
    feature_id: FeatureId,
    tag_id: TagId,
}

impl BannerCacheKey {
    /// Key for the banner serving `tag_id` under `feature_id`.
    pub fn new(feature_id: FeatureId, tag_id: TagId) -> Self {
        Self { feature_id, tag_id }
    }

    pub fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub fn tag_id(&self) -> TagId {
        self.tag_id
    }
}

impl fmt::Display for BannerCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "banner:{}:{}", self.feature_id, self.tag_id)
    }
}
