//! Live banner rows, historical snapshots and mutation inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BannerContent, BannerId, BannerValidationError, FeatureId, TagSet};

/// Input payload for banner creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBanner {
    pub feature_id: FeatureId,
    pub tag_ids: TagSet,
    pub content: BannerContent,
    pub is_active: bool,
}

/// Partial update applied by a banner change.
///
/// Omitted fields keep the live value. An empty patch is still a valid
/// change and advances the revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerPatch {
    pub feature_id: Option<FeatureId>,
    pub tag_ids: Option<TagSet>,
    pub content: Option<BannerContent>,
    pub is_active: Option<bool>,
}

impl BannerPatch {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.feature_id.is_none()
            && self.tag_ids.is_none()
            && self.content.is_none()
            && self.is_active.is_none()
    }
}

/// Current truth for one banner.
///
/// `tag_ids` always equals the tag set recorded in the snapshot at
/// `current_revision`. Reverts reuse revision numbers, so `row_version`
/// is the stamp that identifies one write: every write to the live row
/// advances it and nothing ever rewinds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: BannerId,
    pub feature_id: FeatureId,
    pub tag_ids: TagSet,
    pub content: BannerContent,
    pub is_active: bool,
    pub to_delete: bool,
    pub current_revision: u32,
    pub row_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    /// Merge `patch` into a copy of this banner at the next revision.
    ///
    /// # Examples
    /// ```
    /// use banner_service::domain::banners::{
    ///     Banner, BannerContent, BannerId, BannerPatch, FeatureId, TagSet,
    /// };
    /// use chrono::Utc;
    /// use serde_json::json;
    ///
    /// let now = Utc::now();
    /// let banner = Banner {
    ///     id: BannerId::new(1).expect("positive"),
    ///     feature_id: FeatureId::new(2).expect("positive"),
    ///     tag_ids: TagSet::from_raw([1]).expect("tags"),
    ///     content: BannerContent::new(json!({"title": "x"})),
    ///     is_active: true,
    ///     to_delete: false,
    ///     current_revision: 1,
    ///     row_version: 1,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    /// let patch = BannerPatch {
    ///     content: Some(BannerContent::new(json!({"title": "y"}))),
    ///     ..BannerPatch::default()
    /// };
    /// let next = banner.with_patch(patch, now).expect("revision available");
    /// assert_eq!(next.current_revision, 2);
    /// assert_eq!(next.row_version, 2);
    /// assert_eq!(next.feature_id, banner.feature_id);
    /// ```
    pub fn with_patch(
        &self,
        patch: BannerPatch,
        at: DateTime<Utc>,
    ) -> Result<Self, BannerValidationError> {
        let current_revision = self.next_revision()?;
        let BannerPatch {
            feature_id,
            tag_ids,
            content,
            is_active,
        } = patch;

        Ok(Self {
            id: self.id,
            feature_id: feature_id.unwrap_or(self.feature_id),
            tag_ids: tag_ids.unwrap_or_else(|| self.tag_ids.clone()),
            content: content.unwrap_or_else(|| self.content.clone()),
            is_active: is_active.unwrap_or(self.is_active),
            to_delete: self.to_delete,
            current_revision,
            row_version: self.next_row_version(),
            created_at: self.created_at,
            updated_at: at,
        })
    }

    /// Overwrite the live fields with a historical snapshot.
    ///
    /// The revision pointer moves back to the snapshot's revision while the
    /// row version still moves forward. The activity flag is not part of the
    /// snapshot and is kept.
    pub fn restored_from(&self, version: &BannerVersion, at: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            feature_id: version.feature_id,
            tag_ids: version.tag_ids.clone(),
            content: version.content.clone(),
            is_active: self.is_active,
            to_delete: self.to_delete,
            current_revision: version.revision,
            row_version: self.next_row_version(),
            created_at: self.created_at,
            updated_at: at,
        }
    }

    /// Snapshot of the live fields at `current_revision`.
    pub fn snapshot(&self) -> BannerVersion {
        BannerVersion {
            banner_id: self.id,
            revision: self.current_revision,
            feature_id: self.feature_id,
            tag_ids: self.tag_ids.clone(),
            content: self.content.clone(),
            created_at: self.updated_at,
        }
    }

    fn next_row_version(&self) -> u64 {
        self.row_version.saturating_add(1)
    }

    fn next_revision(&self) -> Result<u32, BannerValidationError> {
        self.current_revision
            .checked_add(1)
            .filter(|next| i32::try_from(*next).is_ok())
            .ok_or(BannerValidationError::RevisionOverflow {
                current: self.current_revision,
            })
    }
}

/// Immutable historical snapshot, one per (banner, revision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerVersion {
    pub banner_id: BannerId,
    pub revision: u32,
    pub feature_id: FeatureId,
    pub tag_ids: TagSet,
    pub content: BannerContent,
    pub created_at: DateTime<Utc>,
}

impl BannerVersion {
    /// True when the snapshot matches the live fields of `banner`.
    pub fn matches(&self, banner: &Banner) -> bool {
        self.banner_id == banner.id
            && self.revision == banner.current_revision
            && self.feature_id == banner.feature_id
            && self.tag_ids == banner.tag_ids
            && self.content == banner.content
    }
}
