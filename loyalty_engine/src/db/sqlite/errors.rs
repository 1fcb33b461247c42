use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(i64),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Could not encode the receipt: {0}")]
    ReceiptEncodingError(#[from] serde_json::Error),
}
