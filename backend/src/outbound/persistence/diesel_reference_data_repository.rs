//! PostgreSQL-backed existence checks for features and tags.

use async_trait::async_trait;
use diesel::dsl::{count_star, exists};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::banners::{FeatureId, TagSet};
use crate::domain::ports::{ReferenceDataRepository, ReferenceDataRepositoryError};

use super::diesel_helpers::{map_reference_diesel_error, map_reference_pool_error};
use super::pool::DbPool;
use super::schema::{features, tags};

/// Diesel-backed implementation of the reference data port.
#[derive(Clone)]
pub struct DieselReferenceDataRepository {
    pool: DbPool,
}

impl DieselReferenceDataRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceDataRepository for DieselReferenceDataRepository {
    async fn feature_exists(
        &self,
        feature_id: FeatureId,
    ) -> Result<bool, ReferenceDataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_reference_pool_error)?;
        diesel::select(exists(features::table.filter(features::id.eq(feature_id.get()))))
            .get_result(&mut conn)
            .await
            .map_err(map_reference_diesel_error)
    }

    async fn tags_exist(&self, tag_ids: &TagSet) -> Result<bool, ReferenceDataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_reference_pool_error)?;
        let found: i64 = tags::table
            .filter(tags::id.eq_any(tag_ids.to_raw()))
            .select(count_star())
            .get_result(&mut conn)
            .await
            .map_err(map_reference_diesel_error)?;
        Ok(usize::try_from(found).is_ok_and(|found| found == tag_ids.len()))
    }
}
