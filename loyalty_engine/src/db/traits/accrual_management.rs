use std::future::Future;

use loyalty_common::MinorUnits;

use super::{InsertResult, ReconciliationOutcome};
use crate::db_types::{AccrualOrder, NewRewardRule, OrderNumber, OrderStatusType, Receipt, RewardRule};

/// The accrual service's store of registered receipts and reward rules.
pub trait AccrualManagement: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Adds a reward rule. A rule whose `match_text` is already held by an active rule is not added again.
    fn register_rule(&self, rule: NewRewardRule) -> impl Future<Output = Result<InsertResult, Self::Error>> + Send;

    /// Soft-deletes the active rule with the given match text. Returns `false` if there was no such rule.
    fn delete_rule(&self, match_text: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn fetch_active_rules(&self) -> impl Future<Output = Result<Vec<RewardRule>, Self::Error>> + Send;

    /// Registers a receipt in state `REGISTERED`. A receipt for an order number that is already registered is ignored.
    fn register_receipt(&self, receipt: Receipt) -> impl Future<Output = Result<InsertResult, Self::Error>> + Send;

    /// Fetches up to `limit` receipts that have not reached a terminal state, oldest first.
    fn fetch_pending_receipts(&self, limit: i64)
        -> impl Future<Output = Result<Vec<AccrualOrder>, Self::Error>> + Send;

    /// Records the calculated disposition of a receipt. Terminal receipts are never changed.
    fn update_accrual_order(
        &self,
        id: i64,
        status: OrderStatusType,
        accrual: MinorUnits,
    ) -> impl Future<Output = Result<ReconciliationOutcome, Self::Error>> + Send;

    fn fetch_accrual_order(
        &self,
        order_number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<AccrualOrder>, Self::Error>> + Send;
}
