//! Port for existence checks against externally owned reference data.
//!
//! Features and tags are owned outside this service. Adapters answer
//! yes/no questions only; an unreachable store is reported as an error and
//! never as "does not exist".

use async_trait::async_trait;

use crate::domain::banners::{FeatureId, TagSet};

use super::define_port_error;

define_port_error! {
    /// Errors raised by reference data adapters.
    pub enum ReferenceDataRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "reference data connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } =>
            "reference data query failed: {message}",
    }
}

/// Existence checks used before any banner mutation is committed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    /// True when the feature exists.
    async fn feature_exists(&self, feature_id: FeatureId)
    -> Result<bool, ReferenceDataRepositoryError>;

    /// True when every tag in the set exists.
    async fn tags_exist(&self, tag_ids: &TagSet) -> Result<bool, ReferenceDataRepositoryError>;
}
