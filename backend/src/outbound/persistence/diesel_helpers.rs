//! Shared helpers for Diesel repository implementations.
//!
//! This module provides:
//! - Error mapping from pool and Diesel errors to port errors
//! - Revision casting between database and domain types
//! - Zero-row disambiguation for optimistic updates

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::banners::{BannerId, BannerValidationError};
use crate::domain::ports::{BannerRepositoryError, ReferenceDataRepositoryError};

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Map pool errors to banner repository errors.
pub fn map_pool_error(error: PoolError) -> BannerRepositoryError {
    BannerRepositoryError::connection(map_pool_error_message(error))
}

/// Map pool errors to reference data errors.
pub fn map_reference_pool_error(error: PoolError) -> ReferenceDataRepositoryError {
    ReferenceDataRepositoryError::connection(map_pool_error_message(error))
}

fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = ?info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(%error, "diesel operation failed"),
    }
}

/// Map Diesel errors to banner repository errors.
///
/// Foreign-key violations mean a feature or tag vanished between the
/// existence check and the write.
pub fn map_diesel_error(error: DieselError) -> BannerRepositoryError {
    log_diesel_error(&error);
    match error {
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::ForeignKeyViolation => BannerRepositoryError::invalid_reference(
                info.constraint_name()
                    .unwrap_or("foreign key violation")
                    .to_owned(),
            ),
            DatabaseErrorKind::ClosedConnection => {
                BannerRepositoryError::connection("database connection error")
            }
            _ => BannerRepositoryError::query("database error"),
        },
        DieselError::QueryBuilderError(_) => BannerRepositoryError::query("database query error"),
        _ => BannerRepositoryError::query("database error"),
    }
}

/// Map Diesel errors to reference data errors.
pub fn map_reference_diesel_error(error: DieselError) -> ReferenceDataRepositoryError {
    log_diesel_error(&error);
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ReferenceDataRepositoryError::connection("database connection error")
        }
        _ => ReferenceDataRepositoryError::query("database error"),
    }
}

/// Report a stored row that no longer satisfies domain invariants.
pub fn map_row_error(error: BannerValidationError) -> BannerRepositoryError {
    debug!(%error, "stored banner row failed validation");
    BannerRepositoryError::query(format!("malformed banner row: {error}"))
}

/// Cast database revision (i32) to domain revision (u32).
///
/// The column carries `CHECK (revision >= 1)`.
#[expect(
    clippy::cast_sign_loss,
    reason = "revision is always positive in database"
)]
pub fn cast_revision(revision: i32) -> u32 {
    revision as u32
}

/// Cast domain revision (u32) to database revision (i32).
///
/// Domain revisions never exceed `i32::MAX`; `Banner::with_patch` refuses
/// to advance past it.
#[expect(
    clippy::cast_possible_wrap,
    reason = "domain caps revisions at i32::MAX"
)]
pub fn cast_revision_for_db(revision: u32) -> i32 {
    revision as i32
}

/// Cast database row version (i64) to domain row version (u64).
///
/// The column carries `CHECK (row_version >= 1)`.
#[expect(
    clippy::cast_sign_loss,
    reason = "row version is always positive in database"
)]
pub fn cast_row_version(row_version: i64) -> u64 {
    row_version as u64
}

/// Cast domain row version (u64) to database row version (i64), saturating.
pub fn cast_row_version_for_db(row_version: u64) -> i64 {
    i64::try_from(row_version).unwrap_or(i64::MAX)
}

/// Result of an optimistic update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Update succeeded (one or more rows affected).
    Success,
    /// Update affected zero rows (revision mismatch or record not found).
    ZeroRows,
}

/// Check if an update affected any rows.
pub fn execute_optimistic_update(updated_rows: usize) -> UpdateResult {
    if updated_rows == 0 {
        UpdateResult::ZeroRows
    } else {
        UpdateResult::Success
    }
}

/// Explain a zero-row compare-and-swap from the row's current state.
///
/// `current` is the stored `(current_revision, row_version)` of a live
/// (non-tombstoned) banner, or `None` when no such banner exists. A
/// matching revision with a moved row version means the revision number
/// was reused by a revert and re-edit.
pub fn disambiguate_update_failure(
    banner_id: BannerId,
    current: Option<(i32, i64)>,
    expected_revision: u32,
) -> BannerRepositoryError {
    match current {
        Some((actual, _)) if cast_revision(actual) != expected_revision => {
            BannerRepositoryError::revision_mismatch(expected_revision, cast_revision(actual))
        }
        Some(_) => BannerRepositoryError::concurrent_write(banner_id.get()),
        None => BannerRepositoryError::not_found(banner_id.get()),
    }
}
