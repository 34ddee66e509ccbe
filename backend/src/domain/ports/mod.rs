//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod banner_cache;
mod banner_command;
mod banner_query;
mod banner_repository;
mod cache_key;
mod reference_data_repository;

#[cfg(test)]
pub use banner_cache::MockBannerCache;
pub use banner_cache::{BannerCache, BannerCacheError};
#[cfg(test)]
pub use banner_command::MockBannerCommand;
pub use banner_command::BannerCommand;
#[cfg(test)]
pub use banner_query::MockBannerQuery;
pub use banner_query::{BannerQuery, GetBannerRequest};
#[cfg(test)]
pub use banner_repository::MockBannerRepository;
pub use banner_repository::{
    ActiveBanner, BannerRepository, BannerRepositoryError, RevisionCommit,
};
pub use cache_key::BannerCacheKey;
#[cfg(test)]
pub use reference_data_repository::MockReferenceDataRepository;
pub use reference_data_repository::{ReferenceDataRepository, ReferenceDataRepositoryError};
