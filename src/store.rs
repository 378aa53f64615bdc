//! Database connection: open (and create) the SQLite database behind `DATABASE_URL`.

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Whether the URL names a private in-memory database.
pub fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Open a pool with foreign keys enforced; the database file is created if missing.
/// In-memory databases get a single connection that is never recycled, so the schema survives.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if is_memory_url(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?
    };
    tracing::info!(memory = is_memory_url(database_url), "database connected");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:inv?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://inventory.db"));
    }

    #[tokio::test]
    async fn memory_pool_enforces_foreign_keys() {
        let pool = connect("sqlite::memory:", 5).await.unwrap();
        let (on,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.unwrap();
        assert_eq!(on, 1);
    }
}
