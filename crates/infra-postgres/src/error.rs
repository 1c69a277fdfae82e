// sqlx::Error -> AppError mapping
//
// Lives here rather than as a From impl in core (orphan rules, and core
// must not depend on sqlx).

use erp_intake_core::error::AppError;

/// PostgreSQL SQLSTATE codes we branch on
mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const INVALID_TEXT_REPRESENTATION: &str = "22P02";
    pub const SEQUENCE_LIMIT_EXCEEDED: &str = "2200H";
}

/// Convert sqlx::Error to AppError with structured information
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            match code.as_str() {
                sqlstate::UNIQUE_VIOLATION => AppError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    message: db_err.message().to_string(),
                },
                sqlstate::CHECK_VIOLATION
                | sqlstate::NOT_NULL_VIOLATION
                | sqlstate::INVALID_TEXT_REPRESENTATION => {
                    let constraint = db_err.constraint().unwrap_or("column constraint");
                    AppError::Validation(format!("{} ({})", db_err.message(), constraint))
                }
                sqlstate::SEQUENCE_LIMIT_EXCEEDED => AppError::Database(format!(
                    "ERP code sequence exhausted: {}",
                    db_err.message()
                )),
                "" => AppError::Database(format!("Database error: {}", db_err.message())),
                other => AppError::Database(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            AppError::Database(format!("Cannot decode column {}: {}", index, source))
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => AppError::Connection(err.to_string()),
        _ => AppError::Database(err.to_string()),
    }
}
