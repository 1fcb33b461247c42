use log::{debug, trace};
use loyalty_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::UserAccount};

pub async fn user_account_by_id(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, UserAccount>(
        r#"
        SELECT id, balance, withdrawn, created_at, updated_at
        FROM user_accounts
        WHERE id = $1"#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await;
    match result {
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(e) => Err(e.into()),
        Ok(a) => Ok(Some(a)),
    }
}

/// Creates an empty account for the user if one does not exist yet.
pub async fn ensure_account(user_id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query("INSERT INTO user_accounts (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!("🧑️ Created a new account for user {user_id}");
    }
    Ok(())
}

/// Adds `amount` to the user's balance, creating the account if necessary.
pub async fn credit_balance(
    user_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    if amount.is_negative() {
        return Err(SqliteDatabaseError::InvalidAmount(format!("Cannot credit a negative amount ({amount})")));
    }
    sqlx::query(
        r#"
        INSERT INTO user_accounts (id, balance) VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET
            balance = balance + excluded.balance,
            updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(user_id)
    .bind(amount.value())
    .execute(conn)
    .await?;
    trace!("🧑️ Credited {amount} to user {user_id}");
    Ok(())
}

/// Debits `amount` from the balance and adds it to the withdrawn total, provided the balance covers it.
///
/// The balance check and the debit are a single statement, so concurrent debits cannot overdraw the account. Returns
/// `false` if the balance was too low or the account does not exist.
pub async fn try_debit_balance(
    user_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE user_accounts SET
            balance = balance - $1,
            withdrawn = withdrawn + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND balance >= $1"#,
    )
    .bind(amount.value())
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
