//! PostgreSQL-backed banner repository.
//!
//! Each mutating port method runs as one Diesel transaction spanning the
//! `banners`, `banner_tags` and `banner_versions` tables. Live-state
//! updates are compare-and-swap on `current_revision` and `row_version`;
//! claim checks take a per-feature advisory lock so concurrent creates
//! cannot both pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::banners::{
    Banner, BannerContent, BannerFilter, BannerId, BannerVersion, DeleteSelector, FeatureId,
    NewBanner, TagId, TagSet,
};
use crate::domain::ports::{
    ActiveBanner, BannerRepository, BannerRepositoryError, RevisionCommit,
};

use super::banner_tag_links::{insert_links, load_tags, load_tags_for, replace_links};
use super::banner_version_store::{insert_version, load_version, load_versions, truncate_above};
use super::diesel_helpers::{
    UpdateResult, cast_revision_for_db, cast_row_version_for_db, disambiguate_update_failure,
    execute_optimistic_update, map_diesel_error, map_pool_error, map_row_error,
};
use super::models::{BannerRow, BannerStateUpdate, NewBannerRow};
use super::pool::DbPool;
use super::schema::{banner_tags, banners};

/// Diesel-backed implementation of the banner repository port.
#[derive(Clone)]
pub struct DieselBannerRepository {
    pool: DbPool,
}

impl DieselBannerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a transaction body: either a raw Diesel error or an
/// already-classified port error. Both roll the transaction back.
#[derive(Debug)]
enum TransactionError {
    Diesel(DieselError),
    Port(BannerRepositoryError),
}

impl From<DieselError> for TransactionError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl From<BannerRepositoryError> for TransactionError {
    fn from(value: BannerRepositoryError) -> Self {
        Self::Port(value)
    }
}

impl From<TransactionError> for BannerRepositoryError {
    fn from(value: TransactionError) -> Self {
        match value {
            TransactionError::Diesel(error) => map_diesel_error(error),
            TransactionError::Port(error) => error,
        }
    }
}

/// Fail with `DuplicateClaim` if another live banner under `feature_id`
/// is linked to any of `tag_ids`.
///
/// Holds a transaction-scoped advisory lock on the feature until commit so
/// concurrent claimants serialise.
async fn ensure_unclaimed(
    conn: &mut AsyncPgConnection,
    feature_id: FeatureId,
    tag_ids: &TagSet,
    exclude: Option<BannerId>,
) -> Result<(), TransactionError> {
    sql_query("SELECT pg_advisory_xact_lock($1)")
        .bind::<BigInt, _>(feature_id.get())
        .execute(conn)
        .await?;

    let mut query = banners::table
        .inner_join(banner_tags::table)
        .filter(banners::feature_id.eq(feature_id.get()))
        .filter(banners::to_delete.eq(false))
        .filter(banner_tags::tag_id.eq_any(tag_ids.to_raw()))
        .select(banners::id)
        .into_boxed();
    if let Some(banner_id) = exclude {
        query = query.filter(banners::id.ne(banner_id.get()));
    }

    let claimant: Option<i64> = query.first(conn).await.optional()?;
    match claimant {
        Some(claimant) => {
            debug!(feature_id = %feature_id, claimant, "banner claim rejected");
            Err(BannerRepositoryError::duplicate_claim(feature_id.get()).into())
        }
        None => Ok(()),
    }
}

/// Write the new live state if the stored revision and row version still
/// match what the caller read.
async fn compare_and_swap(
    conn: &mut AsyncPgConnection,
    commit: &RevisionCommit,
) -> Result<(), TransactionError> {
    let banner = &commit.banner;
    let updated = diesel::update(
        banners::table
            .filter(banners::id.eq(banner.id.get()))
            .filter(banners::to_delete.eq(false))
            .filter(banners::current_revision.eq(cast_revision_for_db(commit.expected_revision)))
            .filter(banners::row_version.eq(cast_row_version_for_db(commit.expected_row_version))),
    )
    .set(BannerStateUpdate::from(banner))
    .execute(conn)
    .await?;

    match execute_optimistic_update(updated) {
        UpdateResult::Success => Ok(()),
        UpdateResult::ZeroRows => {
            let current: Option<(i32, i64)> = banners::table
                .filter(banners::id.eq(banner.id.get()))
                .filter(banners::to_delete.eq(false))
                .select((banners::current_revision, banners::row_version))
                .first(conn)
                .await
                .optional()?;
            Err(disambiguate_update_failure(banner.id, current, commit.expected_revision).into())
        }
    }
}

/// Re-read the snapshot a revert restores and check it still carries the
/// state being written to the live row.
async fn ensure_target_matches(
    conn: &mut AsyncPgConnection,
    banner: &Banner,
) -> Result<(), TransactionError> {
    let Some(row) = load_version(conn, banner.id, banner.current_revision).await? else {
        return Err(BannerRepositoryError::not_found(banner.id.get()).into());
    };
    let target = BannerVersion::try_from(row).map_err(map_row_error)?;
    if !target.matches(banner) {
        debug!(banner_id = %banner.id, revision = target.revision, "revert target was rewritten");
        return Err(BannerRepositoryError::concurrent_write(banner.id.get()).into());
    }
    Ok(())
}

async fn load_banner(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
) -> Result<Option<Banner>, TransactionError> {
    let row: Option<BannerRow> = banners::table
        .filter(banners::id.eq(banner_id.get()))
        .select(BannerRow::as_select())
        .first(conn)
        .await
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };
    let tags = load_tags(conn, banner_id).await?;
    let banner = row.into_banner(tags).map_err(map_row_error)?;
    Ok(Some(banner))
}

async fn load_banners(
    conn: &mut AsyncPgConnection,
    filter: &BannerFilter,
) -> Result<Vec<Banner>, TransactionError> {
    let mut query = banners::table
        .select(BannerRow::as_select())
        .order(banners::id.asc())
        .into_boxed();
    if let Some(feature_id) = filter.feature_id {
        query = query.filter(banners::feature_id.eq(feature_id.get()));
    }
    if let Some(tag_id) = filter.tag_id {
        query = query.filter(
            banners::id.eq_any(
                banner_tags::table
                    .filter(banner_tags::tag_id.eq(tag_id.get()))
                    .select(banner_tags::banner_id),
            ),
        );
    }
    query = query.offset(i64::from(filter.offset));
    if let Some(limit) = filter.limit {
        query = query.limit(i64::from(limit));
    }

    let rows: Vec<BannerRow> = query.load(conn).await?;
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut tags = load_tags_for(conn, &ids).await?;

    let banners = rows
        .into_iter()
        .map(|row| {
            let linked = tags.remove(&row.id).unwrap_or_default();
            row.into_banner(linked).map_err(map_row_error)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(banners)
}

#[async_trait]
impl BannerRepository for DieselBannerRepository {
    async fn create(
        &self,
        banner: &NewBanner,
        created_at: DateTime<Utc>,
    ) -> Result<BannerId, BannerRepositoryError> {
        let row = NewBannerRow {
            feature_id: banner.feature_id.get(),
            content: banner.content.as_value(),
            is_active: banner.is_active,
            to_delete: false,
            current_revision: 1,
            row_version: 1,
            created_at,
            updated_at: created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let banner_id = conn
            .transaction::<_, TransactionError, _>(|conn| {
                async move {
                    ensure_unclaimed(conn, banner.feature_id, &banner.tag_ids, None).await?;

                    let id: i64 = diesel::insert_into(banners::table)
                        .values(&row)
                        .returning(banners::id)
                        .get_result(conn)
                        .await?;
                    let banner_id = BannerId::new(id).map_err(map_row_error)?;

                    insert_version(
                        conn,
                        &BannerVersion {
                            banner_id,
                            revision: 1,
                            feature_id: banner.feature_id,
                            tag_ids: banner.tag_ids.clone(),
                            content: banner.content.clone(),
                            created_at,
                        },
                    )
                    .await?;
                    insert_links(conn, banner_id, &banner.tag_ids).await?;
                    Ok(banner_id)
                }
                .scope_boxed()
            })
            .await?;

        Ok(banner_id)
    }

    async fn commit_revision(
        &self,
        commit: &RevisionCommit,
    ) -> Result<(), BannerRepositoryError> {
        let banner = &commit.banner;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TransactionError, _>(|conn| {
            async move {
                ensure_unclaimed(conn, banner.feature_id, &banner.tag_ids, Some(banner.id))
                    .await?;
                compare_and_swap(conn, commit).await?;
                insert_version(conn, &banner.snapshot()).await?;
                replace_links(conn, banner.id, &banner.tag_ids).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        Ok(())
    }

    async fn revert(&self, commit: &RevisionCommit) -> Result<(), BannerRepositoryError> {
        let banner = &commit.banner;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction::<_, TransactionError, _>(|conn| {
            async move {
                ensure_unclaimed(conn, banner.feature_id, &banner.tag_ids, Some(banner.id))
                    .await?;
                compare_and_swap(conn, commit).await?;
                ensure_target_matches(conn, banner).await?;
                replace_links(conn, banner.id, &banner.tag_ids).await?;
                let dropped = truncate_above(conn, banner.id, banner.current_revision).await?;
                debug!(banner_id = %banner.id, dropped, "banner versions truncated");
                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        Ok(())
    }

    async fn mark_deleted(
        &self,
        banner_id: BannerId,
        at: DateTime<Utc>,
    ) -> Result<bool, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            banners::table
                .filter(banners::id.eq(banner_id.get()))
                .filter(banners::is_active.eq(true))
                .filter(banners::to_delete.eq(false)),
        )
        .set((
            banners::to_delete.eq(true),
            banners::row_version.eq(banners::row_version + 1),
            banners::updated_at.eq(at),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn mark_deleted_by(
        &self,
        selector: DeleteSelector,
        at: DateTime<Utc>,
    ) -> Result<u64, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = (
            banners::to_delete.eq(true),
            banners::row_version.eq(banners::row_version + 1),
            banners::updated_at.eq(at),
        );
        let live = banners::to_delete.eq(false);

        let updated = match selector {
            DeleteSelector::Feature(feature_id) => {
                diesel::update(
                    banners::table
                        .filter(live)
                        .filter(banners::feature_id.eq(feature_id.get())),
                )
                .set(changes)
                .execute(&mut conn)
                .await
            }
            DeleteSelector::Tag(tag_id) => {
                diesel::update(
                    banners::table.filter(live).filter(
                        banners::id.eq_any(
                            banner_tags::table
                                .filter(banner_tags::tag_id.eq(tag_id.get()))
                                .select(banner_tags::banner_id),
                        ),
                    ),
                )
                .set(changes)
                .execute(&mut conn)
                .await
            }
        }
        .map_err(map_diesel_error)?;

        Ok(u64::try_from(updated).unwrap_or(u64::MAX))
    }

    async fn find_by_id(
        &self,
        banner_id: BannerId,
    ) -> Result<Option<Banner>, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let banner = conn
            .transaction::<_, TransactionError, _>(|conn| {
                async move { load_banner(conn, banner_id).await }.scope_boxed()
            })
            .await?;
        Ok(banner)
    }

    async fn find_active(
        &self,
        feature_id: FeatureId,
        tag_id: TagId,
    ) -> Result<Option<ActiveBanner>, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let found: Option<(i64, serde_json::Value)> = banners::table
            .inner_join(banner_tags::table)
            .filter(banners::feature_id.eq(feature_id.get()))
            .filter(banner_tags::tag_id.eq(tag_id.get()))
            .filter(banners::is_active.eq(true))
            .filter(banners::to_delete.eq(false))
            .select((banners::id, banners::content))
            .order(banners::id.asc())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        found
            .map(|(id, content)| {
                Ok(ActiveBanner {
                    banner_id: BannerId::new(id).map_err(map_row_error)?,
                    content: BannerContent::new(content),
                })
            })
            .transpose()
    }

    async fn list(&self, filter: &BannerFilter) -> Result<Vec<Banner>, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let banners = conn
            .transaction::<_, TransactionError, _>(|conn| {
                async move { load_banners(conn, filter).await }.scope_boxed()
            })
            .await?;
        Ok(banners)
    }

    async fn versions(
        &self,
        banner_id: BannerId,
    ) -> Result<Vec<BannerVersion>, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = load_versions(&mut conn, banner_id)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|row| BannerVersion::try_from(row).map_err(map_row_error))
            .collect()
    }

    async fn version(
        &self,
        banner_id: BannerId,
        revision: u32,
    ) -> Result<Option<BannerVersion>, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = load_version(&mut conn, banner_id, revision)
            .await
            .map_err(map_diesel_error)?;
        row.map(|row| BannerVersion::try_from(row).map_err(map_row_error))
            .transpose()
    }

    async fn purge_tombstoned(&self) -> Result<u64, BannerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let purged = diesel::delete(banners::table.filter(banners::to_delete.eq(true)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(purged).unwrap_or(u64::MAX))
    }
}
