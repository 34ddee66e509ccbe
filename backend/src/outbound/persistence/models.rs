//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! identifiers and report malformed rows as query errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::banners::{
    Banner, BannerContent, BannerId, BannerValidationError, BannerVersion, FeatureId, TagSet,
};

use super::diesel_helpers::{
    cast_revision, cast_revision_for_db, cast_row_version, cast_row_version_for_db,
};
use super::schema::{banner_tags, banner_versions, banners};

/// Row struct for reading from the banners table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = banners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BannerRow {
    pub id: i64,
    pub feature_id: i64,
    pub content: serde_json::Value,
    pub is_active: bool,
    pub to_delete: bool,
    pub current_revision: i32,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BannerRow {
    /// Combine the row with its linked tags.
    pub fn into_banner(self, tag_ids: Vec<i64>) -> Result<Banner, BannerValidationError> {
        Ok(Banner {
            id: BannerId::new(self.id)?,
            feature_id: FeatureId::new(self.feature_id)?,
            tag_ids: TagSet::from_raw(tag_ids)?,
            content: BannerContent::new(self.content),
            is_active: self.is_active,
            to_delete: self.to_delete,
            current_revision: cast_revision(self.current_revision),
            row_version: cast_row_version(self.row_version),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for creating banner rows at revision 1.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = banners)]
pub(crate) struct NewBannerRow<'a> {
    pub feature_id: i64,
    pub content: &'a serde_json::Value,
    pub is_active: bool,
    pub to_delete: bool,
    pub current_revision: i32,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied when a new live state is committed.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = banners)]
pub(crate) struct BannerStateUpdate<'a> {
    pub feature_id: i64,
    pub content: &'a serde_json::Value,
    pub is_active: bool,
    pub current_revision: i32,
    pub row_version: i64,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Banner> for BannerStateUpdate<'a> {
    fn from(banner: &'a Banner) -> Self {
        Self {
            feature_id: banner.feature_id.get(),
            content: banner.content.as_value(),
            is_active: banner.is_active,
            current_revision: cast_revision_for_db(banner.current_revision),
            row_version: cast_row_version_for_db(banner.row_version),
            updated_at: banner.updated_at,
        }
    }
}

/// Insertable struct for tag links.
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = banner_tags)]
pub(crate) struct BannerTagRow {
    pub banner_id: i64,
    pub tag_id: i64,
}

/// Row struct for reading and writing version snapshots.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = banner_versions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BannerVersionRow {
    pub banner_id: i64,
    pub revision: i32,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&BannerVersion> for BannerVersionRow {
    fn from(version: &BannerVersion) -> Self {
        Self {
            banner_id: version.banner_id.get(),
            revision: cast_revision_for_db(version.revision),
            feature_id: version.feature_id.get(),
            tag_ids: version.tag_ids.to_raw(),
            content: version.content.as_value().clone(),
            created_at: version.created_at,
        }
    }
}

impl TryFrom<BannerVersionRow> for BannerVersion {
    type Error = BannerValidationError;

    fn try_from(row: BannerVersionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            banner_id: BannerId::new(row.banner_id)?,
            revision: cast_revision(row.revision),
            feature_id: FeatureId::new(row.feature_id)?,
            tag_ids: TagSet::from_raw(row.tag_ids)?,
            content: BannerContent::new(row.content),
            created_at: row.created_at,
        })
    }
}
