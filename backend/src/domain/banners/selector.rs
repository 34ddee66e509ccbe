//! Bulk selectors used by deletion and listing.

use serde::{Deserialize, Serialize};

use super::{BannerValidationError, FeatureId, TagId};

/// Target of a bulk tombstone request: one feature or one tag, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum DeleteSelector {
    Feature(FeatureId),
    Tag(TagId),
}

impl DeleteSelector {
    /// Build a selector from a raw pair where `0` means "absent".
    ///
    /// # Examples
    /// ```
    /// use banner_service::domain::banners::{DeleteSelector, FeatureId};
    ///
    /// let selector = DeleteSelector::from_raw(4, 0).expect("one selector");
    /// assert_eq!(selector, DeleteSelector::Feature(FeatureId::new(4).expect("positive")));
    /// assert!(DeleteSelector::from_raw(4, 2).is_err());
    /// ```
    pub fn from_raw(feature_id: i64, tag_id: i64) -> Result<Self, BannerValidationError> {
        match (feature_id, tag_id) {
            (0, 0) => Err(BannerValidationError::AmbiguousSelector),
            (feature, 0) => FeatureId::new(feature).map(Self::Feature),
            (0, tag) => TagId::new(tag).map(Self::Tag),
            _ => Err(BannerValidationError::AmbiguousSelector),
        }
    }
}

/// Listing filter. Every restriction is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerFilter {
    pub feature_id: Option<FeatureId>,
    pub tag_id: Option<TagId>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl BannerFilter {
    /// Only banners under `feature_id`.
    pub fn with_feature(mut self, feature_id: FeatureId) -> Self {
        self.feature_id = Some(feature_id);
        self
    }

    /// Only banners linked to `tag_id`.
    pub fn with_tag(mut self, tag_id: TagId) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    /// Cap the page size; `0` removes the cap.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Skip the first `offset` matches.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}
