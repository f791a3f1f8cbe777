//! Database migrations for `SQLite`.
//!
//! Migrations are embedded at compile time and run programmatically,
//! tracked in the `_anteroom_migrations` table so re-running is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use anteroom::sqlite::migrations;
//! use sqlx::SqlitePool;
//!
//! async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
//!     migrations::run(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::{Executor, SqlitePool};

const CORE_MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250801000001_create_organizations_table",
        include_str!("../../migrations_sqlite/core/20250801000001_create_organizations_table.sql"),
    ),
    (
        "20250801000002_create_users_table",
        include_str!("../../migrations_sqlite/core/20250801000002_create_users_table.sql"),
    ),
    (
        "20250801000003_create_roles_table",
        include_str!("../../migrations_sqlite/core/20250801000003_create_roles_table.sql"),
    ),
    (
        "20250801000004_create_permissions_table",
        include_str!("../../migrations_sqlite/core/20250801000004_create_permissions_table.sql"),
    ),
    (
        "20250801000005_create_role_permissions_table",
        include_str!(
            "../../migrations_sqlite/core/20250801000005_create_role_permissions_table.sql"
        ),
    ),
    (
        "20250801000006_create_memberships_table",
        include_str!("../../migrations_sqlite/core/20250801000006_create_memberships_table.sql"),
    ),
    (
        "20250801000007_create_invitations_table",
        include_str!("../../migrations_sqlite/core/20250801000007_create_invitations_table.sql"),
    ),
];

/// Runs all database migrations.
///
/// Applied migrations are recorded by name; only new ones execute.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _anteroom_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    run_migrations(pool, CORE_MIGRATIONS).await
}

/// Runs a set of migrations against the database.
///
/// # Limitations
///
/// SQL statements are split by semicolons (`;`), so migrations containing
/// semicolons within string literals will not work correctly. The bundled
/// migrations are written to avoid this.
async fn run_migrations(pool: &SqlitePool, migrations: &[(&str, &str)]) -> Result<(), sqlx::Error> {
    for (name, sql) in migrations {
        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _anteroom_migrations WHERE name = ?)")
                .bind(*name)
                .fetch_one(pool)
                .await?;

        if !applied {
            // SQLite doesn't support multiple statements in one execute,
            // so split by semicolons and run each statement
            for statement in sql.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    pool.execute(trimmed).await?;
                }
            }

            sqlx::query("INSERT INTO _anteroom_migrations (name) VALUES (?)")
                .bind(*name)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}
