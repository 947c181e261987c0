//! Schema migrations for the trip store.
//!
//! Each migration is a pair of SQL files in this directory:
//! - `migration_NN_up.sql` moves the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` moves it back from `NN` to `NN-1`
//!
//! The `schema_version` table itself is created by `bootstrap`, never by a migration, so that a
//! down migration to version 0 leaves a database that can be migrated up again.

use crate::error::Res;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

/// The schema version this build of the binary expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    /// The version reached after running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Creates the `schema_version` table at version 0 in a brand new database.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Res<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;

    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read schema_version")?;
    if rows.0 == 0 {
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(pool)
            .await
            .context("Failed to insert initial schema version")?;
    }
    Ok(())
}

/// Reads the schema version recorded in the database.
pub(crate) async fn current_version(pool: &SqlitePool) -> Res<i32> {
    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version, is this a pact database?")?;
    row.0.context("The schema_version table is empty")
}

/// Moves the schema from `current_ver` to `target_ver`, one migration at a time. Each step runs in
/// its own transaction together with its `schema_version` update.
///
/// All needed migrations are checked for before any of them runs.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Res<()> {
    if current_ver == target_ver {
        debug!("Database already at target version {target_ver}, no migrations needed");
        return Ok(());
    }

    validate_migrations(current_ver, target_ver)?;

    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            let migration = find(version)?;
            debug!("Running migration {version:02} (up)");
            run_single_migration(pool, migration.up_sql, version).await?;
        }
    } else {
        for version in (target_ver + 1..=current_ver).rev() {
            let migration = find(version)?;
            debug!("Running migration {version:02} (down)");
            run_single_migration(pool, migration.down_sql, version - 1).await?;
        }
    }

    debug!("Migration complete, schema now at version {target_ver}");
    Ok(())
}

fn find(version: i32) -> Res<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;

    Ok(())
}

fn validate_migrations(current_version: i32, target_version: i32) -> Res<()> {
    let (start, end) = if current_version < target_version {
        (current_version + 1, target_version)
    } else {
        (target_version + 1, current_version)
    };

    for version in start..=end {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!(
                "Migration {version} is missing but required to migrate from version \
                {current_version} to {target_version}"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    const TABLES: &[&str] = &[
        "profiles",
        "trips",
        "trip_members",
        "pledges",
        "itinerary_items",
        "expenses",
        "budgets",
    ];

    async fn create_test_db() -> Res<(TempDir, SqlitePool)> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let db_path = temp_dir.path().join("test.sqlite");

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .context("Failed to parse SQLite connection string")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to create SQLite database")?;

        bootstrap(&pool).await?;
        Ok((temp_dir, pool))
    }

    async fn table_exists(pool: &SqlitePool, table_name: &str) -> Res<bool> {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table_name)
                .fetch_one(pool)
                .await
                .context("Failed to check table existence")?;
        Ok(row.0 > 0)
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        bootstrap(&pool).await.unwrap();
        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows.0, 1);
        assert_eq!(current_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migration_up_creates_tables() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 0);

        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), CURRENT_VERSION);

        for table in TABLES {
            assert!(table_exists(&pool, table).await.unwrap(), "{table} missing");
        }
    }

    #[tokio::test]
    async fn test_migration_down_drops_tables() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 0).await.unwrap();

        assert_eq!(current_version(&pool).await.unwrap(), 0);
        for table in TABLES {
            assert!(!table_exists(&pool, table).await.unwrap(), "{table} remains");
        }
        assert!(table_exists(&pool, "schema_version").await.unwrap());

        // And back up again.
        run(&pool, 0, 1).await.unwrap();
        assert!(table_exists(&pool, "expenses").await.unwrap());
    }

    #[tokio::test]
    async fn test_expense_split_method_default() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        run(&pool, 0, 1).await.unwrap();
        sqlx::query(
            "INSERT INTO trips (id, title, created_by, created_at) \
            VALUES ('t', 'Goa', 'a', '2024-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO expenses (id, trip_id, paid_by, amount, created_at) \
            VALUES ('e', 't', 'a', '10', '2024-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let row: (String,) = sqlx::query_as("SELECT split_method FROM expenses WHERE id = 'e'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, "split_equally");
    }

    #[tokio::test]
    async fn test_migration_no_op_when_already_at_target() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_validate_migrations() {
        assert!(validate_migrations(0, 1).is_ok());
        assert!(validate_migrations(1, 0).is_ok());
        assert!(validate_migrations(0, 2).is_err());
        assert!(validate_migrations(1, 3).is_err());
    }
}
