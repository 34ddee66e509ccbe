//! Driving port for banner mutations and revision history.
//!
//! Every method either applies all of its writes or none of them, and
//! fails with exactly one [`crate::domain::ErrorCode`].

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::banners::{BannerId, BannerPatch, BannerVersion, DeleteSelector, NewBanner};

/// Driving port for administrative banner operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BannerCommand: Send + Sync {
    /// Create a banner at revision 1 and return its identifier.
    ///
    /// Fails with `invalid_reference` when the feature or any tag is
    /// unknown, and with `conflict` when another live banner under the same
    /// feature already serves one of the tags.
    async fn create_banner(&self, banner: NewBanner) -> Result<BannerId, Error>;

    /// Apply a partial update and advance the revision by one.
    async fn change_banner(&self, banner_id: BannerId, patch: BannerPatch) -> Result<(), Error>;

    /// Tombstone one active banner.
    async fn delete_banner(&self, banner_id: BannerId) -> Result<(), Error>;

    /// Tombstone every banner under a feature or linked to a tag.
    /// Returns the number of banners marked.
    async fn delete_banners(&self, selector: DeleteSelector) -> Result<u64, Error>;

    /// Stored revisions by ascending number.
    async fn list_versions(&self, banner_id: BannerId) -> Result<Vec<BannerVersion>, Error>;

    /// Restore a stored revision and discard every revision above it.
    async fn revert_banner(&self, banner_id: BannerId, revision: u32) -> Result<(), Error>;
}
