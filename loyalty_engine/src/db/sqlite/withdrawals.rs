use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewWithdrawal, Withdrawal},
};

pub async fn insert_withdrawal(
    withdrawal: &NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO withdrawals (user_id, order_number, amount) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(withdrawal.user_id)
    .bind(withdrawal.order_number.as_str())
    .bind(withdrawal.amount.value())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Withdrawal #{id} of {} by user {} recorded", withdrawal.amount, withdrawal.user_id);
    Ok(id)
}

/// All withdrawals for the user, most recent first.
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, SqliteDatabaseError> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
        SELECT id, user_id, order_number, amount, processed_at
        FROM withdrawals
        WHERE user_id = $1
        ORDER BY processed_at DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(withdrawals)
}
