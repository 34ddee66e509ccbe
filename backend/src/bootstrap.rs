//! Startup wiring from settings to ready-to-use services.

use std::sync::Arc;

use mockable::DefaultClock;
use tracing::{info, warn};

use crate::domain::banners::{BannerReadService, BannerRevisionService};
use crate::domain::ports::{BannerCache, BannerCacheError};
use crate::domain::{RetentionSweeper, ScheduleParseError};
use crate::outbound::cache::{RedisBannerCache, StubBannerCache};
use crate::outbound::persistence::{
    DbPool, DieselBannerRepository, DieselReferenceDataRepository, MigrationError, PoolConfig,
    PoolError, run_pending_migrations,
};
use crate::settings::AppSettings;

/// Command service backed by PostgreSQL.
pub type RevisionService = BannerRevisionService<DieselBannerRepository, DieselReferenceDataRepository>;

/// Query service backed by PostgreSQL and whichever cache is configured.
pub type ReadService = BannerReadService<DieselBannerRepository, dyn BannerCache>;

/// Failures that prevent the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Cache(#[from] BannerCacheError),
    #[error("invalid sweep schedule: {0}")]
    Schedule(#[from] ScheduleParseError),
}

/// Everything a transport layer needs to serve banner requests.
pub struct BannerServices {
    pub revisions: Arc<RevisionService>,
    pub reads: Arc<ReadService>,
    pub sweeper: RetentionSweeper,
    pub pool: DbPool,
}

impl BannerServices {
    /// Migrate the schema, open the pool and assemble services.
    pub async fn connect(settings: &AppSettings) -> Result<Self, BootstrapError> {
        let schedule = settings.sweep_schedule()?;
        let database_url = settings.database_url();

        if settings.run_migrations {
            run_pending_migrations(database_url).await?;
        }

        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.db_max_connections()),
        )
        .await?;
        let cache = build_cache(settings).await?;

        let clock = Arc::new(DefaultClock);
        let banner_repo = Arc::new(DieselBannerRepository::new(pool.clone()));
        let reference_data = Arc::new(DieselReferenceDataRepository::new(pool.clone()));

        let revisions = Arc::new(BannerRevisionService::new(
            banner_repo.clone(),
            reference_data,
            clock.clone(),
        ));
        let reads = Arc::new(BannerReadService::new(
            banner_repo.clone(),
            cache,
            settings.cache_ttl(),
        ));
        let sweeper = RetentionSweeper::new(banner_repo, schedule, clock);

        info!(%schedule, "banner services ready");
        Ok(Self {
            revisions,
            reads,
            sweeper,
            pool,
        })
    }
}

async fn build_cache(settings: &AppSettings) -> Result<Arc<dyn BannerCache>, BootstrapError> {
    match settings.redis_url() {
        Some(url) => {
            let cache = RedisBannerCache::connect(url).await?;
            info!("banner cache enabled");
            Ok(Arc::new(cache))
        }
        None => {
            warn!("no redis url configured; banner cache disabled");
            Ok(Arc::new(StubBannerCache::new()))
        }
    }
}
