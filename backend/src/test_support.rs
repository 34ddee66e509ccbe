//! In-memory port adapters for tests.
//!
//! These adapters keep the contracts of the PostgreSQL and Redis adapters
//! (all-or-nothing writes, claim checks, revision compare-and-swap, TTL
//! expiry) without any infrastructure, so service behaviour can be
//! exercised deterministically. Each exposes an `unavailable` switch to
//! simulate an outage.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

use crate::domain::banners::{
    Banner, BannerContent, BannerFilter, BannerId, BannerVersion, DeleteSelector, FeatureId,
    NewBanner, TagId, TagSet,
};
use crate::domain::ports::{
    ActiveBanner, BannerCache, BannerCacheError, BannerCacheKey, BannerRepository,
    BannerRepositoryError, ReferenceDataRepository, ReferenceDataRepositoryError,
    RevisionCommit,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[derive(Debug, Default)]
struct ReferenceState {
    features: BTreeSet<FeatureId>,
    tags: BTreeSet<TagId>,
    unavailable: bool,
}

/// Known features and tags.
#[derive(Debug, Default)]
pub struct InMemoryReferenceData {
    state: Mutex<ReferenceState>,
}

impl InMemoryReferenceData {
    /// Reference data seeded from raw ids; non-positive ids are ignored.
    pub fn seeded(
        features: impl IntoIterator<Item = i64>,
        tags: impl IntoIterator<Item = i64>,
    ) -> Self {
        let data = Self::default();
        for feature in features.into_iter().filter_map(|id| FeatureId::new(id).ok()) {
            data.add_feature(feature);
        }
        for tag in tags.into_iter().filter_map(|id| TagId::new(id).ok()) {
            data.add_tag(tag);
        }
        data
    }

    /// Register a feature as known.
    pub fn add_feature(&self, feature_id: FeatureId) {
        lock(&self.state).features.insert(feature_id);
    }

    /// Register a tag as known.
    pub fn add_tag(&self, tag_id: TagId) {
        lock(&self.state).tags.insert(tag_id);
    }

    /// Make every lookup fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    fn knows_feature(&self, feature_id: FeatureId) -> bool {
        lock(&self.state).features.contains(&feature_id)
    }

    fn knows_tags(&self, tag_ids: &TagSet) -> bool {
        let state = lock(&self.state);
        tag_ids.iter().all(|tag| state.tags.contains(&tag))
    }

    fn check_available(&self) -> Result<(), ReferenceDataRepositoryError> {
        if lock(&self.state).unavailable {
            return Err(ReferenceDataRepositoryError::connection(
                "reference data unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceDataRepository for InMemoryReferenceData {
    async fn feature_exists(
        &self,
        feature_id: FeatureId,
    ) -> Result<bool, ReferenceDataRepositoryError> {
        self.check_available()?;
        Ok(self.knows_feature(feature_id))
    }

    async fn tags_exist(&self, tag_ids: &TagSet) -> Result<bool, ReferenceDataRepositoryError> {
        self.check_available()?;
        Ok(self.knows_tags(tag_ids))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    last_id: i64,
    banners: BTreeMap<BannerId, Banner>,
    versions: BTreeMap<(BannerId, u32), BannerVersion>,
    unavailable: bool,
}

impl StoreState {
    /// Another live banner under `feature_id` linked to any of `tag_ids`.
    fn claimant(
        &self,
        feature_id: FeatureId,
        tag_ids: &TagSet,
        exclude: Option<BannerId>,
    ) -> Option<BannerId> {
        self.banners
            .values()
            .filter(|banner| Some(banner.id) != exclude)
            .filter(|banner| !banner.to_delete && banner.feature_id == feature_id)
            .find(|banner| banner.tag_ids.intersects(tag_ids))
            .map(|banner| banner.id)
    }

    fn ensure_unclaimed(
        &self,
        feature_id: FeatureId,
        tag_ids: &TagSet,
        exclude: Option<BannerId>,
    ) -> Result<(), BannerRepositoryError> {
        match self.claimant(feature_id, tag_ids, exclude) {
            Some(_) => Err(BannerRepositoryError::duplicate_claim(feature_id.get())),
            None => Ok(()),
        }
    }

    /// The compare half of compare-and-swap.
    fn live_revision(&self, commit: &RevisionCommit) -> Result<(), BannerRepositoryError> {
        let banner_id = commit.banner.id;
        let live = self
            .banners
            .get(&banner_id)
            .filter(|banner| !banner.to_delete)
            .ok_or_else(|| BannerRepositoryError::not_found(banner_id.get()))?;
        if live.current_revision != commit.expected_revision {
            return Err(BannerRepositoryError::revision_mismatch(
                commit.expected_revision,
                live.current_revision,
            ));
        }
        if live.row_version != commit.expected_row_version {
            return Err(BannerRepositoryError::concurrent_write(banner_id.get()));
        }
        Ok(())
    }
}

/// Banner store keeping rows, tag links and versions in one locked state.
///
/// Every mutation validates against the locked state before writing, so a
/// rejected call leaves nothing behind. Foreign keys are emulated against
/// the shared [`InMemoryReferenceData`].
#[derive(Debug)]
pub struct InMemoryBannerRepository {
    reference_data: Arc<InMemoryReferenceData>,
    state: Mutex<StoreState>,
}

impl InMemoryBannerRepository {
    /// Empty store whose foreign keys resolve against `reference_data`.
    pub fn new(reference_data: Arc<InMemoryReferenceData>) -> Self {
        Self {
            reference_data,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Make every call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Number of banner rows, tombstoned or not.
    pub fn banner_count(&self) -> usize {
        lock(&self.state).banners.len()
    }

    /// Number of version rows across every banner.
    pub fn version_count(&self) -> usize {
        lock(&self.state).versions.len()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, BannerRepositoryError> {
        let state = lock(&self.state);
        if state.unavailable {
            return Err(BannerRepositoryError::connection("banner store unavailable"));
        }
        Ok(state)
    }

    fn ensure_references(
        &self,
        feature_id: FeatureId,
        tag_ids: &TagSet,
    ) -> Result<(), BannerRepositoryError> {
        if !self.reference_data.knows_feature(feature_id) {
            return Err(BannerRepositoryError::invalid_reference(
                "banners_feature_id_fkey",
            ));
        }
        if !self.reference_data.knows_tags(tag_ids) {
            return Err(BannerRepositoryError::invalid_reference(
                "banner_tags_tag_id_fkey",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BannerRepository for InMemoryBannerRepository {
    async fn create(
        &self,
        banner: &NewBanner,
        created_at: DateTime<Utc>,
    ) -> Result<BannerId, BannerRepositoryError> {
        let mut state = self.state()?;
        state.ensure_unclaimed(banner.feature_id, &banner.tag_ids, None)?;
        self.ensure_references(banner.feature_id, &banner.tag_ids)?;

        let next_id = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| BannerRepositoryError::query("banner id sequence exhausted"))?;
        let banner_id = BannerId::new(next_id)
            .map_err(|err| BannerRepositoryError::query(err.to_string()))?;
        let row = Banner {
            id: banner_id,
            feature_id: banner.feature_id,
            tag_ids: banner.tag_ids.clone(),
            content: banner.content.clone(),
            is_active: banner.is_active,
            to_delete: false,
            current_revision: 1,
            row_version: 1,
            created_at,
            updated_at: created_at,
        };

        state.last_id = next_id;
        state.versions.insert((banner_id, 1), row.snapshot());
        state.banners.insert(banner_id, row);
        Ok(banner_id)
    }

    async fn commit_revision(
        &self,
        commit: &RevisionCommit,
    ) -> Result<(), BannerRepositoryError> {
        let banner = &commit.banner;
        let mut state = self.state()?;
        state.ensure_unclaimed(banner.feature_id, &banner.tag_ids, Some(banner.id))?;
        state.live_revision(commit)?;
        self.ensure_references(banner.feature_id, &banner.tag_ids)?;
        if state
            .versions
            .contains_key(&(banner.id, banner.current_revision))
        {
            return Err(BannerRepositoryError::query(
                "duplicate key value violates unique constraint \"banner_versions_pkey\"",
            ));
        }

        state
            .versions
            .insert((banner.id, banner.current_revision), banner.snapshot());
        state.banners.insert(banner.id, banner.clone());
        Ok(())
    }

    async fn revert(&self, commit: &RevisionCommit) -> Result<(), BannerRepositoryError> {
        let banner = &commit.banner;
        let mut state = self.state()?;
        state.ensure_unclaimed(banner.feature_id, &banner.tag_ids, Some(banner.id))?;
        state.live_revision(commit)?;
        match state.versions.get(&(banner.id, banner.current_revision)) {
            None => return Err(BannerRepositoryError::not_found(banner.id.get())),
            Some(target) if !target.matches(banner) => {
                return Err(BannerRepositoryError::concurrent_write(banner.id.get()));
            }
            Some(_) => {}
        }

        state
            .versions
            .retain(|(id, revision), _| *id != banner.id || *revision <= banner.current_revision);
        state.banners.insert(banner.id, banner.clone());
        Ok(())
    }

    async fn mark_deleted(
        &self,
        banner_id: BannerId,
        at: DateTime<Utc>,
    ) -> Result<bool, BannerRepositoryError> {
        let mut state = self.state()?;
        let Some(banner) = state
            .banners
            .get_mut(&banner_id)
            .filter(|banner| banner.is_active && !banner.to_delete)
        else {
            return Ok(false);
        };
        banner.to_delete = true;
        banner.row_version = banner.row_version.saturating_add(1);
        banner.updated_at = at;
        Ok(true)
    }

    async fn mark_deleted_by(
        &self,
        selector: DeleteSelector,
        at: DateTime<Utc>,
    ) -> Result<u64, BannerRepositoryError> {
        let mut state = self.state()?;
        let mut marked = 0_u64;
        for banner in state.banners.values_mut().filter(|banner| !banner.to_delete) {
            let selected = match selector {
                DeleteSelector::Feature(feature_id) => banner.feature_id == feature_id,
                DeleteSelector::Tag(tag_id) => banner.tag_ids.contains(tag_id),
            };
            if selected {
                banner.to_delete = true;
                banner.row_version = banner.row_version.saturating_add(1);
                banner.updated_at = at;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn find_by_id(
        &self,
        banner_id: BannerId,
    ) -> Result<Option<Banner>, BannerRepositoryError> {
        Ok(self.state()?.banners.get(&banner_id).cloned())
    }

    async fn find_active(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
    ) -> Result<Option<ActiveBanner>, BannerRepositoryError> {
        let state = self.state()?;
        Ok(state
            .banners
            .values()
            .find(|banner| {
                banner.is_active
                    && !banner.to_delete
                    && banner.feature_id == feature_id
                    && banner.tag_ids.contains(tag_id)
            })
            .map(|banner| ActiveBanner {
                banner_id: banner.id,
                content: banner.content.clone(),
            }))
    }

    async fn list(&self, filter: &BannerFilter) -> Result<Vec<Banner>, BannerRepositoryError> {
        let state = self.state()?;
        let matching = state
            .banners
            .values()
            .filter(|banner| filter.feature_id.is_none_or(|id| banner.feature_id == id))
            .filter(|banner| filter.tag_id.is_none_or(|id| banner.tag_ids.contains(id)))
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX));
        let page = match filter.limit {
            Some(limit) => matching
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            None => matching.cloned().collect(),
        };
        Ok(page)
    }

    async fn versions(
        &self,
        banner_id: BannerId,
    ) -> Result<Vec<BannerVersion>, BannerRepositoryError> {
        let state = self.state()?;
        Ok(state
            .versions
            .range((banner_id, 0)..=(banner_id, u32::MAX))
            .map(|(_, version)| version.clone())
            .collect())
    }

    async fn version(
        &self,
        banner_id: BannerId,
        revision: u32,
    ) -> Result<Option<BannerVersion>, BannerRepositoryError> {
        Ok(self.state()?.versions.get(&(banner_id, revision)).cloned())
    }

    async fn purge_tombstoned(&self) -> Result<u64, BannerRepositoryError> {
        let mut state = self.state()?;
        let doomed: BTreeSet<BannerId> = state
            .banners
            .values()
            .filter(|banner| banner.to_delete)
            .map(|banner| banner.id)
            .collect();
        state.banners.retain(|id, _| !doomed.contains(id));
        state.versions.retain(|(id, _), _| !doomed.contains(id));
        Ok(u64::try_from(doomed.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<BannerCacheKey, (BannerContent, DateTime<Utc>)>,
    unavailable: bool,
}

/// TTL-honouring cache driven by an injected clock.
pub struct InMemoryBannerCache {
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl Default for InMemoryBannerCache {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryBannerCache {
    /// Empty cache measuring expiry with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Make every call fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Content stored under `key`, ignoring expiry.
    pub fn stored(&self, key: &BannerCacheKey) -> Option<BannerContent> {
        lock(&self.state)
            .entries
            .get(key)
            .map(|(content, _)| content.clone())
    }

    fn state(&self) -> Result<MutexGuard<'_, CacheState>, BannerCacheError> {
        let state = lock(&self.state);
        if state.unavailable {
            return Err(BannerCacheError::backend("cache unavailable"));
        }
        Ok(state)
    }
}

#[async_trait]
impl BannerCache for InMemoryBannerCache {
    async fn get(&self, key: &BannerCacheKey) -> Result<Option<BannerContent>, BannerCacheError> {
        let now = self.clock.utc();
        let mut state = self.state()?;
        let expired = matches!(
            state.entries.get(key),
            Some((_, expires_at)) if *expires_at <= now
        );
        if expired {
            state.entries.remove(key);
            return Ok(None);
        }
        Ok(state.entries.get(key).map(|(content, _)| content.clone()))
    }

    async fn put(
        &self,
        key: &BannerCacheKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), BannerCacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| BannerCacheError::serialization(err.to_string()))?;
        let expires_at = self.clock.utc() + ttl;
        self.state()?
            .entries
            .insert(*key, (content.clone(), expires_at));
        Ok(())
    }
}
