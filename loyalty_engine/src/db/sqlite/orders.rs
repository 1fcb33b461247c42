use log::{debug, trace};
use loyalty_common::MinorUnits;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Order, OrderNumber, OrderStatusType},
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, accrual, uploaded_at, updated_at";

/// Inserts a new order in state `NEW`, unless the order number is already taken.
///
/// Returns the new order's id, or `None` when an order with this number already exists (owned by anyone). This is
/// not atomic with any other call. Run it inside a transaction and pass `&mut *tx` as the connection if you need that.
pub async fn insert_order_if_absent(
    order_number: &OrderNumber,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO orders (order_number, user_id, status) VALUES ($1, $2, $3)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(order_number.as_str())
    .bind(user_id)
    .bind(OrderStatusType::New.to_string())
    .fetch_optional(conn)
    .await?;
    if let Some(id) = id {
        debug!("🗃️ Order {order_number} for user {user_id} has been saved in the DB with id {id}");
    }
    Ok(id)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
        .bind(order_number.as_str())
        .fetch_one(conn)
        .await;
    match order {
        Err(sqlx::Error::RowNotFound) => Ok(None),
        Err(e) => Err(e.into()),
        Ok(o) => Ok(Some(o)),
    }
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// All orders for the user, most recently uploaded first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqliteDatabaseError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ Fetched {} orders for user {user_id}", orders.len());
    Ok(orders)
}

/// Fetches up to `limit` orders whose status is one of `statuses`, in insertion order.
pub async fn fetch_orders_with_status(
    statuses: &[OrderStatusType],
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    if statuses.is_empty() || limit <= 0 {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ("));
    let mut separated = builder.separated(", ");
    for status in statuses {
        separated.push_bind(status.to_string());
    }
    separated.push_unseparated(") ORDER BY id ASC LIMIT ");
    builder.push_bind(limit);
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Moves the order to `status` and sets its accrual, but only if its current status is one of `allowed_from`.
///
/// Returns the id of the order's owner if the row was updated, and `None` otherwise.
pub async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    accrual: MinorUnits,
    allowed_from: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    if allowed_from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
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
    separated.push_unseparated(") RETURNING user_id");
    trace!("🗃️ Executing query: {}", builder.sql());
    let owner = builder.build_query_scalar::<i64>().fetch_optional(conn).await?;
    Ok(owner)
}
