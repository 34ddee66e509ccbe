//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `BANNERS_*` environment variables, CLI flags and config
//! files. Absent optional values fall back to the defaults below.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{DailySchedule, ScheduleParseError};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/banners";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Configuration for the banner service process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BANNERS")]
pub struct AppSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Redis connection URL. Caching is disabled when absent.
    pub redis_url: Option<String>,
    /// Lifetime of cached banner content in seconds.
    pub cache_ttl_secs: Option<u64>,
    /// Daily retention sweep time as `HH:MM` UTC.
    pub sweep_at: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// Return the configured database URL, falling back to the default.
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Return the configured Redis URL, ignoring blank values.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Lifetime of cached banner content; 300 seconds unless configured.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    /// Parse the configured sweep time, falling back to 03:30 UTC.
    pub fn sweep_schedule(&self) -> Result<DailySchedule, ScheduleParseError> {
        match self.sweep_at.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(DailySchedule::default()),
        }
    }

    /// Upper bound on pooled database connections.
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for service configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "BANNERS_DATABASE_URL",
        "BANNERS_REDIS_URL",
        "BANNERS_CACHE_TTL_SECS",
        "BANNERS_SWEEP_AT",
        "BANNERS_DB_MAX_CONNECTIONS",
        "BANNERS_RUN_MIGRATIONS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("banner-service")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), DEFAULT_DATABASE_URL);
        assert!(settings.redis_url().is_none());
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
        assert_eq!(
            settings.sweep_schedule().expect("default schedule"),
            DailySchedule::default()
        );
        assert_eq!(settings.db_max_connections(), 10);
        assert!(settings.run_migrations);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "BANNERS_DATABASE_URL",
                Some("postgres://svc@db/banners".to_owned()),
            ),
            ("BANNERS_REDIS_URL", Some("redis://cache:6379".to_owned())),
            ("BANNERS_CACHE_TTL_SECS", Some("60".to_owned())),
            ("BANNERS_SWEEP_AT", Some("04:15".to_owned())),
            ("BANNERS_DB_MAX_CONNECTIONS", Some("4".to_owned())),
            ("BANNERS_RUN_MIGRATIONS", Some("false".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), "postgres://svc@db/banners");
        assert_eq!(settings.redis_url(), Some("redis://cache:6379"));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(60));
        assert_eq!(
            settings.sweep_schedule().expect("valid schedule").to_string(),
            "04:15 UTC"
        );
        assert_eq!(settings.db_max_connections(), 4);
        assert!(!settings.run_migrations);
    }

    #[rstest]
    fn blank_redis_url_disables_cache() {
        let mut guard_vars = VARS.map(|name| (name, None::<String>));
        guard_vars[1] = ("BANNERS_REDIS_URL", Some("  ".to_owned()));
        let _guard = lock_env(guard_vars);

        assert!(load_from_empty_args().redis_url().is_none());
    }

    #[rstest]
    fn malformed_sweep_time_is_reported() {
        let mut guard_vars = VARS.map(|name| (name, None::<String>));
        guard_vars[3] = ("BANNERS_SWEEP_AT", Some("half past three".to_owned()));
        let _guard = lock_env(guard_vars);

        let err = load_from_empty_args()
            .sweep_schedule()
            .expect_err("unparseable time");
        assert!(matches!(err, ScheduleParseError::Format { .. }));
    }
}
