//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **cache**: Redis-backed banner content cache and an always-miss stub
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations.

pub mod cache;
pub mod persistence;
