//! Tag link statements run inside banner repository transactions.

use std::collections::HashMap;

use diesel::QueryResult;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::banners::{BannerId, TagSet};

use super::models::BannerTagRow;
use super::schema::banner_tags;

/// Link every tag in the set to the banner.
pub(super) async fn insert_links(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
    tag_ids: &TagSet,
) -> QueryResult<usize> {
    let rows: Vec<BannerTagRow> = tag_ids
        .iter()
        .map(|tag_id| BannerTagRow {
            banner_id: banner_id.get(),
            tag_id: tag_id.get(),
        })
        .collect();
    diesel::insert_into(banner_tags::table)
        .values(&rows)
        .execute(conn)
        .await
}

/// Make the banner's links equal exactly `tag_ids`.
pub(super) async fn replace_links(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
    tag_ids: &TagSet,
) -> QueryResult<usize> {
    diesel::delete(banner_tags::table.filter(banner_tags::banner_id.eq(banner_id.get())))
        .execute(conn)
        .await?;
    insert_links(conn, banner_id, tag_ids).await
}

/// Tags linked to one banner, ascending.
pub(super) async fn load_tags(
    conn: &mut AsyncPgConnection,
    banner_id: BannerId,
) -> QueryResult<Vec<i64>> {
    banner_tags::table
        .filter(banner_tags::banner_id.eq(banner_id.get()))
        .select(banner_tags::tag_id)
        .order(banner_tags::tag_id.asc())
        .load(conn)
        .await
}

/// Tags linked to each of the given banners.
pub(super) async fn load_tags_for(
    conn: &mut AsyncPgConnection,
    banner_ids: &[i64],
) -> QueryResult<HashMap<i64, Vec<i64>>> {
    if banner_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let links: Vec<(i64, i64)> = banner_tags::table
        .filter(banner_tags::banner_id.eq_any(banner_ids))
        .select((banner_tags::banner_id, banner_tags::tag_id))
        .order((banner_tags::banner_id.asc(), banner_tags::tag_id.asc()))
        .load(conn)
        .await?;

    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (banner_id, tag_id) in links {
        grouped.entry(banner_id).or_default().push(tag_id);
    }
    Ok(grouped)
}
