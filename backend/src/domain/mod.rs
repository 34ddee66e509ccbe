//! Domain primitives, services and ports.
//!
//! Purpose: Define the banner model, the revision engine and read path that
//! operate on it, and the ports through which storage and cache adapters
//! plug in. Nothing in this module depends on Diesel or Redis.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic failure payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - banners: value types plus `BannerRevisionService` and
//!   `BannerReadService`.
//! - RetentionSweeper: recurring purge of tombstoned banners.

pub mod banners;
pub mod error;
pub mod ports;
pub mod retention_sweeper;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::retention_sweeper::{
    DailySchedule, RetentionSweeper, ScheduleParseError, SweepSleeper, TokioSweepSleeper,
    request_shutdown,
};
