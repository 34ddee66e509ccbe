//! Version history statements run inside banner repository transactions.
//!
//! Snapshots are only ever inserted or truncated from the top; existing
//! rows are never updated.

use diesel::QueryResult;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::banners::{BannerId, BannerVersion};

use super::diesel_helpers::cast_revision_for_db;
use super::models::BannerVersionRow;
use super::schema::banner_versions;

/// Append one snapshot.
pub(super) async fn insert_version(
    conn: &mut AsyncPgConnection,
    version: &BannerVersion,
) -> QueryResult<usize> {
    diesel::insert_into(banner_versions::table)
        .values(BannerVersionRow::from(version))
        .execute(conn)
        .await
}

/// Drop every snapshot above `revision`.
pub(super) async fn truncate_above(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
    revision: u32,
) -> QueryResult<usize> {
    diesel::delete(
        banner_versions::table
            .filter(banner_versions::banner_id.eq(banner_id.get()))
            .filter(banner_versions::revision.gt(cast_revision_for_db(revision))),
    )
    .execute(conn)
    .await
}

/// All snapshots of a banner by ascending revision.
pub(super) async fn load_versions(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
) -> QueryResult<Vec<BannerVersionRow>> {
    banner_versions::table
        .filter(banner_versions::banner_id.eq(banner_id.get()))
        .select(BannerVersionRow::as_select())
        .order(banner_versions::revision.asc())
        .load(conn)
        .await
}

pub(super) async fn load_version(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
    revision: u32,
) -> QueryResult<Option<BannerVersionRow>> {
    banner_versions::table
        .filter(banner_versions::banner_id.eq(banner_id.get()))
        .filter(banner_versions::revision.eq(cast_revision_for_db(revision)))
        .select(BannerVersionRow::as_select())
        .first(conn)
        .await
        .optional()
}
