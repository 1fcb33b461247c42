//! JSON bodies for the mart's user-facing API. Amounts are decimals in major units.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use loyalty_engine::db_types::{Order, OrderStatusType, UserAccount, Withdrawal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatusType,
    /// Only present once the order has been processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let accrual = (order.status == OrderStatusType::Processed).then(|| order.accrual.to_major());
        Self {
            number: order.order_number.as_str().to_string(),
            status: order.status,
            accrual,
            uploaded_at: order.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub current: f64,
    pub withdrawn: f64,
}

impl From<UserAccount> for BalanceResponse {
    fn from(account: UserAccount) -> Self {
        Self { current: account.balance.to_major(), withdrawn: account.withdrawn.to_major() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// The order the points are spent on. It does not need to have been uploaded first.
    pub order: String,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: f64,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self { order: w.order_number, sum: w.amount.to_major(), processed_at: w.processed_at }
    }
}
