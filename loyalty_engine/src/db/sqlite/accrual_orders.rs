use log::{debug, trace};
use loyalty_common::MinorUnits;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertResult},
    db_types::{AccrualOrder, OrderNumber, OrderStatusType, Receipt},
};

const ACCRUAL_ORDER_COLUMNS: &str = "id, order_number, status, accrual, receipt, uploaded_at, updated_at";

/// Stores the receipt in state `REGISTERED`. If the order number is already registered, the existing id is returned and
/// the stored receipt is left alone.
pub async fn idempotent_insert(
    receipt: &Receipt,
    conn: &mut SqliteConnection,
) -> Result<InsertResult, SqliteDatabaseError> {
    let lines = serde_json::to_string(&receipt.lines)?;
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO accrual_orders (order_number, status, receipt) VALUES ($1, $2, $3)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(receipt.order_number.as_str())
    .bind(OrderStatusType::Registered.to_string())
    .bind(lines)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = id {
        debug!("🗃️ Receipt for {} registered with id {id}", receipt.order_number);
        return Ok(InsertResult::Inserted(id));
    }
    let existing = fetch_accrual_order(&receipt.order_number, conn).await?.ok_or_else(|| {
        SqliteDatabaseError::QueryError(format!("Order {} conflicted, but could not be found", receipt.order_number))
    })?;
    Ok(InsertResult::AlreadyExists(existing.id))
}

pub async fn fetch_accrual_order(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<AccrualOrder>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, AccrualOrder>(&format!(
        "SELECT {ACCRUAL_ORDER_COLUMNS} FROM accrual_orders WHERE order_number = $1"
    ))
    .bind(order_number.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_pending(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<AccrualOrder>, SqliteDatabaseError> {
    if limit <= 0 {
        return Ok(vec![]);
    }
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {ACCRUAL_ORDER_COLUMNS} FROM accrual_orders WHERE status IN ("));
    let mut separated = builder.separated(", ");
    for status in OrderStatusType::PENDING {
        separated.push_bind(status.to_string());
    }
    separated.push_unseparated(") ORDER BY id ASC LIMIT ");
    builder.push_bind(limit);
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<AccrualOrder>().fetch_all(conn).await?;
    Ok(orders)
}

/// Sets the status and accrual of a receipt if its current status is one of `allowed_from`. Returns whether the row
/// was updated.
pub async fn update_status(
    id: i64,
    status: OrderStatusType,
    accrual: MinorUnits,
    allowed_from: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    if allowed_from.is_empty() {
        return Ok(false);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE accrual_orders SET status = ");
    builder.push_bind(status.to_string());
    builder.push(", accrual = ");
    builder.push_bind(accrual.value());
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status IN (");
    let mut separated = builder.separated(", ");
    for s in allowed_from {
        separated.push_bind(s.to_string());
    }
    separated.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_status(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderStatusType>, SqliteDatabaseError> {
    let status = sqlx::query_scalar::<_, OrderStatusType>("SELECT status FROM accrual_orders WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(status)
}
