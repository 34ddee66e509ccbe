//! Port for the banner store and its append-only version history.
//!
//! Every mutating method is a single unit of work: adapters apply all of
//! its writes or none of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::banners::{
    Banner, BannerContent, BannerFilter, BannerId, BannerVersion, DeleteSelector, FeatureId,
    NewBanner, TagId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by banner repository adapters.
    pub enum BannerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "banner repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "banner repository query failed: {message}",
        /// The banner does not exist or has been tombstoned.
        NotFound { banner_id: i64 } =>
            "banner {banner_id} not found",
        /// The live revision moved since the caller read it.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "banner revision mismatch: expected {expected}, found {actual}",
        /// The live row was rewritten since the caller read it, even though
        /// its revision number came back to the same value.
        ConcurrentWrite { banner_id: i64 } =>
            "banner {banner_id} was rewritten since it was read",
        /// Another live banner already serves one of the requested tags
        /// under the same feature.
        DuplicateClaim { feature_id: i64 } =>
            "feature {feature_id} already has a banner for one of the requested tags",
        /// A foreign key was rejected by storage.
        InvalidReference { message: String } =>
            "banner references unknown data: {message}",
    }
}

/// New live state plus the live state it was derived from.
///
/// Adapters persist `banner` only if the stored row still carries both
/// `expected_revision` and `expected_row_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionCommit {
    pub banner: Banner,
    pub expected_revision: u32,
    pub expected_row_version: u64,
}

impl RevisionCommit {
    /// Commit `banner` over the `live` row it was derived from.
    pub fn over(live: &Banner, banner: Banner) -> Self {
        Self {
            banner,
            expected_revision: live.current_revision,
            expected_row_version: live.row_version,
        }
    }
}

/// Content of the single live banner serving a (feature, tag) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBanner {
    pub banner_id: BannerId,
    pub content: BannerContent,
}

/// Port for banner rows, tag links and revision snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BannerRepository: Send + Sync {
    /// Insert a banner at revision 1 with its snapshot and tag links.
    ///
    /// Fails with `DuplicateClaim` when another live banner under the same
    /// feature is linked to any of the requested tags.
    async fn create(
        &self,
        banner: &NewBanner,
        created_at: DateTime<Utc>,
    ) -> Result<BannerId, BannerRepositoryError>;

    /// Append the snapshot at `commit.banner.current_revision`, relink
    /// tags and update the live row.
    async fn commit_revision(&self, commit: &RevisionCommit)
    -> Result<(), BannerRepositoryError>;

    /// Overwrite the live row with a restored snapshot and drop every
    /// version above `commit.banner.current_revision`.
    ///
    /// The stored snapshot at the target revision is re-read inside the
    /// unit of work; if it no longer matches `commit.banner` the call fails
    /// with `ConcurrentWrite`.
    async fn revert(&self, commit: &RevisionCommit) -> Result<(), BannerRepositoryError>;

    /// Tombstone one active banner. Returns false when nothing matched.
    async fn mark_deleted(
        &self,
        banner_id: BannerId,
        at: DateTime<Utc>,
    ) -> Result<bool, BannerRepositoryError>;

    /// Tombstone every live banner matching the selector.
    async fn mark_deleted_by(
        &self,
        selector: DeleteSelector,
        at: DateTime<Utc>,
    ) -> Result<u64, BannerRepositoryError>;

    /// Load the live row, including tombstoned banners.
    async fn find_by_id(
        &self,
        banner_id: BannerId,
    ) -> Result<Option<Banner>, BannerRepositoryError>;

    /// Resolve the active, non-tombstoned banner for a (feature, tag) pair.
    async fn find_active(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
    ) -> Result<Option<ActiveBanner>, BannerRepositoryError>;

    /// List banners ordered by id.
    async fn list(&self, filter: &BannerFilter) -> Result<Vec<Banner>, BannerRepositoryError>;

    /// Every stored version of a banner, by ascending revision.
    async fn versions(
        &self,
        banner_id: BannerId,
    ) -> Result<Vec<BannerVersion>, BannerRepositoryError>;

    /// One stored version.
    async fn version(
        &self,
        banner_id: BannerId,
        revision: u32,
    ) -> Result<Option<BannerVersion>, BannerRepositoryError>;

    /// Physically delete tombstoned banners and everything they own.
    async fn purge_tombstoned(&self) -> Result<u64, BannerRepositoryError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn revision_mismatch_formats_both_revisions() {
        let err = BannerRepositoryError::revision_mismatch(2_u32, 3_u32);
        assert_eq!(
            err.to_string(),
            "banner revision mismatch: expected 2, found 3"
        );
    }

    #[rstest]
    fn concurrent_write_names_banner() {
        let err = BannerRepositoryError::concurrent_write(9_i64);
        assert_eq!(err.to_string(), "banner 9 was rewritten since it was read");
    }

    #[rstest]
    fn duplicate_claim_names_feature() {
        let err = BannerRepositoryError::duplicate_claim(4_i64);
        assert!(err.to_string().contains("feature 4"));
    }
}
