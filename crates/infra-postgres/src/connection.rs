// PostgreSQL Connection Pool & Scoped Transactions

use crate::config::{validate_schema_name, DatabaseConfig};
use crate::error::map_sqlx_error;
use erp_intake_core::error::{AppError, Result};
use futures::future::BoxFuture;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::PgConnection;
use tracing::{info, warn};

/// Connect options derived from the explicit configuration
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .application_name("erp-intake");

    match &config.schema {
        Some(schema) => options.options([("search_path", schema.as_str())]),
        None => options,
    }
}

/// Create the connection pool.
///
/// Fails with `AppError::Connection` when the server cannot be reached.
/// A configured schema is created if it does not exist yet.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options(config))
        .await
        .map_err(|e| AppError::Connection(e.to_string()))?;

    if let Some(schema) = &config.schema {
        validate_schema_name(schema)?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
    }

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        schema = ?config.schema,
        "Connected to registration store"
    );
    Ok(pool)
}

/// Run `work` inside one transaction.
///
/// Commits when `work` returns `Ok`, rolls back and returns the original
/// error otherwise. The connection goes back to the pool on every path;
/// if the future is dropped mid-flight the transaction is rolled back
/// when the handle is dropped.
pub async fn with_transaction<T, F>(pool: &PgPool, work: F) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>> + Send,
{
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Connection(e.to_string()))?;

    match work(&mut *tx).await {
        Ok(value) => {
            tx.commit().await.map_err(map_sqlx_error)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed after error");
            }
            Err(err)
        }
    }
}
