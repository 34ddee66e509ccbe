//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the banner storage ports backed by
//! PostgreSQL via `diesel-async` and `bb8` connection pooling.
//!
//! - **Thin adapters**: repositories translate between Diesel rows and
//!   domain types. Claim checks and revision compare-and-swap run inside a
//!   single transaction per write.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leak to the domain layer.
//! - **Strongly typed errors**: database failures map onto the port error
//!   enums.
//!
//! # Example
//!
//! ```ignore
//! use banner_service::outbound::persistence::{DbPool, DieselBannerRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/banners")).await?;
//! let repo = DieselBannerRepository::new(pool);
//! ```

mod banner_tag_links;
mod banner_version_store;
mod diesel_banner_repository;
pub(crate) mod diesel_helpers;
mod diesel_reference_data_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_banner_repository::DieselBannerRepository;
pub use diesel_reference_data_repository::DieselReferenceDataRepository;
pub use migrations::{
    MIGRATIONS, MigrationError, run_pending_migrations, run_pending_migrations_blocking,
};
pub use pool::{DbPool, PoolConfig, PoolError};
