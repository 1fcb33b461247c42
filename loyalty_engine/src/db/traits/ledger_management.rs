use std::future::Future;

use loyalty_common::MinorUnits;

use super::{ReconciliationOutcome, RegisterOrderResult, WithdrawResult};
use crate::db_types::{NewWithdrawal, Order, OrderNumber, OrderStatusType, UserAccount, Withdrawal};

/// The mart's order ledger.
///
/// Methods return `Send` futures so that implementations can be driven from spawned reconciliation workers.
pub trait LedgerManagement: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Records that `user_id` uploaded `order_number`.
    ///
    /// Creates the user's account on first contact. An order number is owned by the first user to upload it, forever.
    fn register_order(
        &self,
        order_number: &OrderNumber,
        user_id: i64,
    ) -> impl Future<Output = Result<RegisterOrderResult, Self::Error>> + Send;

    /// Fetches up to `limit` orders in a non-terminal state (`NEW`, `REGISTERED` or `PROCESSING`), oldest first.
    fn fetch_pending_orders(&self, limit: i64) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send;

    /// Atomically moves an order to `status`, and when `status` is `PROCESSED`, credits `accrual` to the owner.
    ///
    /// The credit always goes to the order's stored owner. Terminal orders are never touched again, so an accrual can
    /// be credited at most once per order, no matter how many workers race to apply it.
    fn apply_reconciliation_result(
        &self,
        order_id: i64,
        user_id: i64,
        status: OrderStatusType,
        accrual: MinorUnits,
    ) -> impl Future<Output = Result<ReconciliationOutcome, Self::Error>> + Send;

    /// Atomically debits the user's balance and records the withdrawal, provided the balance covers the amount.
    fn withdraw(&self, withdrawal: NewWithdrawal) -> impl Future<Output = Result<WithdrawResult, Self::Error>> + Send;

    /// All orders uploaded by the user, newest first. `None` if the user has never been seen.
    fn fetch_user_orders(&self, user_id: i64) -> impl Future<Output = Result<Option<Vec<Order>>, Self::Error>> + Send;

    fn fetch_user_balance(&self, user_id: i64) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send;

    /// All withdrawals made by the user, newest first. `None` if the user has never been seen.
    fn fetch_user_withdrawals(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Vec<Withdrawal>>, Self::Error>> + Send;

    fn fetch_order_by_number(
        &self,
        order_number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;
}
