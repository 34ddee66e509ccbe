//! Banner versioning service.
//!
//! `domain` holds value types, the revision and read services and the
//! retention sweeper, all written against ports. `outbound` provides the
//! PostgreSQL and Redis adapters; `bootstrap` wires them from
//! [`settings::AppSettings`].

pub mod bootstrap;
pub mod domain;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
