//! Shared helpers for integration suites that need embedded PostgreSQL.
//!
//! Each test gets its own database cloned from a template that already has
//! the embedded migrations applied. The template is keyed by a hash of the
//! migrations directory so schema changes never reuse a stale template.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use banner_service::outbound::persistence::run_pending_migrations_blocking;
use pg_embedded_setup_unpriv::test_support::{hash_directory, shared_cluster_handle};
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
static DATABASE_COUNTER: AtomicUsize = AtomicUsize::new(0);

const TEMPLATE_NAME_PREFIX: &str = "banners_template";

/// Returns true when `REQUIRE_TEST_CLUSTER` is set to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn require_test_cluster() -> bool {
    std::env::var("REQUIRE_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skips the calling test when the cluster cannot start, unless
/// `REQUIRE_TEST_CLUSTER` demands it.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if require_test_cluster() {
        panic!("Test cluster setup failed: {reason}. Unset REQUIRE_TEST_CLUSTER to skip.");
    }
    eprintln!("SKIP-TEST-CLUSTER: {reason}");
    None
}

/// Render a `postgres` error with its SQLSTATE and detail when present.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, String> {
    let hash = hash_directory(migrations_dir()).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

fn new_test_database_name() -> String {
    let sequence = DATABASE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("banners_test_{}_{sequence}", std::process::id())
}

/// Creates or reuses a template database with the latest migrations applied.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, String> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        run_pending_migrations_blocking(&url).map_err(|err| err.to_string())?;
    }

    Ok(template_name)
}

/// Provisions a migrated, empty database on the shared embedded cluster.
pub fn provision_database() -> Result<TemporaryDatabase, String> {
    let cluster = shared_cluster_handle().map_err(|err| format!("start cluster: {err:?}"))?;
    let template_name = ensure_template_database(cluster)?;
    cluster
        .temporary_database_from_template(new_test_database_name().as_str(), template_name.as_str())
        .map_err(|err| format!("create database from template: {err:?}"))
}

/// Inserts features and tags by id.
pub fn seed_reference_data(url: &str, features: &[i64], tags: &[i64]) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    for id in features {
        client
            .execute("INSERT INTO features (id) VALUES ($1)", &[id])
            .map_err(|err| format_postgres_error(&err))?;
    }
    for id in tags {
        client
            .execute("INSERT INTO tags (id) VALUES ($1)", &[id])
            .map_err(|err| format_postgres_error(&err))?;
    }
    Ok(())
}

/// Counts rows in `table` with a raw query, bypassing the adapter.
pub fn count_rows(url: &str, table: &str) -> Result<i64, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let escaped_name = table.replace('"', "\"\"");
    let row = client
        .query_one(format!(r#"SELECT COUNT(*) FROM "{escaped_name}""#).as_str(), &[])
        .map_err(|err| format_postgres_error(&err))?;
    Ok(row.get(0))
}
