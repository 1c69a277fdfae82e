// Migration Runner

use crate::error::map_sqlx_error;
use erp_intake_core::error::Result;
use sqlx::PgPool;
use tracing::info;

/// Embedded migrations, applied in order
const MIGRATIONS: &[(i32, &str, &str)] = &[(
    1,
    "Initial schema",
    include_str!("../migrations/001_initial_schema.sql"),
)];

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    // schema_version lives in whatever schema search_path resolves to
    let table_exists: bool = sqlx::query_scalar(
        "SELECT to_regclass('schema_version') IS NOT NULL",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current_version: i32 = if table_exists {
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .map_err(map_sqlx_error)?
    } else {
        0
    };

    info!("Current schema version: {}", current_version);

    for (version, name, sql) in MIGRATIONS {
        if current_version < *version {
            info!("Applying migration {:03}: {}", version, name);
            apply_migration(pool, sql).await?;
        }
    }

    info!("All migrations applied successfully");
    Ok(())
}

/// Apply a single migration SQL file in its own transaction
async fn apply_migration(pool: &PgPool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    for statement in split_statements(sql) {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Split by semicolon, dropping comment lines and empty statements
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
