mod db;
mod errors;

pub mod accrual_orders;
pub mod orders;
pub mod reward_rules;
pub mod user_accounts;
pub mod withdrawals;

use std::{str::FromStr, time::Duration};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a connection pool, creating the database file if it does not exist yet.
///
/// WAL journaling lets readers proceed while a reconciliation worker holds the write lock.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    info!("🗃️ Opening database at {url}");
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
