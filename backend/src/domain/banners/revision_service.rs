//! Revision engine: create, change, delete and revert banners.
//!
//! Reference data is validated before the repository is asked to write,
//! and every write carries the revision it was derived from so concurrent
//! edits surface as conflicts rather than lost updates.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::Error;
use crate::domain::ports::{
    BannerCommand, BannerRepository, ReferenceDataRepository, RevisionCommit,
};

use super::service_support::{map_reference_error, map_repository_error};
use super::{
    Banner, BannerId, BannerPatch, BannerVersion, DeleteSelector, FeatureId, NewBanner, TagSet,
};

/// Banner service implementing the command driving port.
#[derive(Clone)]
pub struct BannerRevisionService<R, X> {
    banner_repo: Arc<R>,
    reference_data: Arc<X>,
    clock: Arc<dyn Clock>,
}

impl<R, X> BannerRevisionService<R, X> {
    /// Create a service over the banner store and reference data.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use banner_service::domain::banners::BannerRevisionService;
    /// # use banner_service::test_support::{InMemoryBannerRepository, InMemoryReferenceData};
    /// # use mockable::DefaultClock;
    /// let reference_data = Arc::new(InMemoryReferenceData::default());
    /// let service = BannerRevisionService::new(
    ///     Arc::new(InMemoryBannerRepository::new(reference_data.clone())),
    ///     reference_data,
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(banner_repo: Arc<R>, reference_data: Arc<X>, clock: Arc<dyn Clock>) -> Self {
        Self {
            banner_repo,
            reference_data,
            clock,
        }
    }
}

impl<R, X> BannerRevisionService<R, X>
where
    R: BannerRepository,
    X: ReferenceDataRepository,
{
    async fn ensure_feature(&self, feature_id: FeatureId) -> Result<(), Error> {
        let exists = self
            .reference_data
            .feature_exists(feature_id)
            .await
            .map_err(map_reference_error)?;
        if exists {
            Ok(())
        } else {
            Err(Error::invalid_reference(format!(
                "feature {feature_id} does not exist"
            )))
        }
    }

    async fn ensure_tags(&self, tag_ids: &TagSet) -> Result<(), Error> {
        let exists = self
            .reference_data
            .tags_exist(tag_ids)
            .await
            .map_err(map_reference_error)?;
        if exists {
            Ok(())
        } else {
            Err(Error::invalid_reference(format!(
                "one or more tags in {:?} do not exist",
                tag_ids.to_raw()
            )))
        }
    }

    /// Load a banner that is still eligible for edits.
    async fn load_live(&self, banner_id: BannerId) -> Result<Banner, Error> {
        self.banner_repo
            .find_by_id(banner_id)
            .await
            .map_err(map_repository_error)?
            .filter(|banner| !banner.to_delete)
            .ok_or_else(|| Error::not_found(format!("banner {banner_id} not found")))
    }
}

#[async_trait]
impl<R, X> BannerCommand for BannerRevisionService<R, X>
where
    R: BannerRepository,
    X: ReferenceDataRepository,
{
    async fn create_banner(&self, banner: NewBanner) -> Result<BannerId, Error> {
        self.ensure_feature(banner.feature_id).await?;
        self.ensure_tags(&banner.tag_ids).await?;

        let banner_id = self
            .banner_repo
            .create(&banner, self.clock.utc())
            .await
            .map_err(map_repository_error)?;

        info!(
            banner_id = %banner_id,
            feature_id = %banner.feature_id,
            tags = ?banner.tag_ids.to_raw(),
            "banner created"
        );
        Ok(banner_id)
    }

    async fn change_banner(&self, banner_id: BannerId, patch: BannerPatch) -> Result<(), Error> {
        let live = self.load_live(banner_id).await?;

        if let Some(feature_id) = patch.feature_id {
            self.ensure_feature(feature_id).await?;
        }
        if let Some(tag_ids) = patch.tag_ids.as_ref() {
            self.ensure_tags(tag_ids).await?;
        }

        let empty_patch = patch.is_empty();
        let next = live
            .with_patch(patch, self.clock.utc())
            .map_err(|err| Error::conflict(err.to_string()))?;
        let revision = next.current_revision;

        self.banner_repo
            .commit_revision(&RevisionCommit::over(&live, next))
            .await
            .map_err(map_repository_error)?;

        info!(banner_id = %banner_id, revision, empty_patch, "banner revision committed");
        Ok(())
    }

    async fn delete_banner(&self, banner_id: BannerId) -> Result<(), Error> {
        let marked = self
            .banner_repo
            .mark_deleted(banner_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?;
        if !marked {
            return Err(Error::not_found(format!("banner {banner_id} not found")));
        }

        info!(banner_id = %banner_id, "banner tombstoned");
        Ok(())
    }

    async fn delete_banners(&self, selector: DeleteSelector) -> Result<u64, Error> {
        match selector {
            DeleteSelector::Feature(feature_id) => self.ensure_feature(feature_id).await?,
            DeleteSelector::Tag(tag_id) => self.ensure_tags(&TagSet::new([tag_id])?).await?,
        }

        let marked = self
            .banner_repo
            .mark_deleted_by(selector, self.clock.utc())
            .await
            .map_err(map_repository_error)?;

        info!(?selector, marked, "banners tombstoned");
        Ok(marked)
    }

    async fn list_versions(&self, banner_id: BannerId) -> Result<Vec<BannerVersion>, Error> {
        let versions = self
            .banner_repo
            .versions(banner_id)
            .await
            .map_err(map_repository_error)?;
        if versions.is_empty() {
            return Err(Error::not_found(format!(
                "banner {banner_id} has no versions"
            )));
        }
        Ok(versions)
    }

    async fn revert_banner(&self, banner_id: BannerId, revision: u32) -> Result<(), Error> {
        let live = self.load_live(banner_id).await?;
        let target = self
            .banner_repo
            .version(banner_id, revision)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| {
                Error::not_found(format!("banner {banner_id} has no revision {revision}"))
            })?;

        let restored = live.restored_from(&target, self.clock.utc());
        debug!(
            banner_id = %banner_id,
            from = live.current_revision,
            to = revision,
            "reverting banner"
        );

        self.banner_repo
            .revert(&RevisionCommit::over(&live, restored))
            .await
            .map_err(map_repository_error)?;

        info!(banner_id = %banner_id, revision, "banner reverted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "revision_service_tests.rs"]
mod tests;
