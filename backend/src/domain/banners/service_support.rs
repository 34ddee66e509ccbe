//! Port error translation shared by the banner services.
//!
//! Raw adapter errors stop here; callers only ever see domain [`Error`]s.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::{BannerRepositoryError, ReferenceDataRepositoryError};

pub(crate) fn map_repository_error(error: BannerRepositoryError) -> Error {
    match error {
        BannerRepositoryError::Connection { message } => {
            Error::storage_failure(format!("banner storage unavailable: {message}"))
        }
        BannerRepositoryError::Query { message } => {
            Error::storage_failure(format!("banner storage error: {message}"))
        }
        BannerRepositoryError::NotFound { banner_id } => {
            Error::not_found(format!("banner {banner_id} not found"))
        }
        BannerRepositoryError::RevisionMismatch { expected, actual } => {
            Error::conflict("banner was modified concurrently").with_details(json!({
                "expectedRevision": expected,
                "actualRevision": actual,
            }))
        }
        BannerRepositoryError::ConcurrentWrite { banner_id } => {
            Error::conflict("banner was modified concurrently")
                .with_details(json!({ "bannerId": banner_id }))
        }
        BannerRepositoryError::DuplicateClaim { feature_id } => Error::conflict(format!(
            "feature {feature_id} already has a banner for one of the requested tags"
        ))
        .with_details(json!({ "featureId": feature_id })),
        BannerRepositoryError::InvalidReference { message } => {
            Error::invalid_reference(format!("banner references unknown data: {message}"))
        }
    }
}

pub(crate) fn map_reference_error(error: ReferenceDataRepositoryError) -> Error {
    match error {
        ReferenceDataRepositoryError::Connection { message } => {
            Error::storage_failure(format!("reference data unavailable: {message}"))
        }
        ReferenceDataRepositoryError::Query { message } => {
            Error::storage_failure(format!("reference data error: {message}"))
        }
    }
}
