use std::fmt::Debug;

use log::*;
use loyalty_common::MinorUnits;

use super::{JobOutcome, PackHandler, Throttle};
use crate::{
    accrual_client::{AccrualClient, AccrualResponse, AccrualState},
    db::traits::{LedgerManagement, ReconciliationOutcome},
    db_types::{Order, OrderStatusType},
};

/// The mart's reconciliation job: ask the accrual service about each pending order and record the answer.
#[derive(Clone)]
pub struct EnrichmentHandler<B, C> {
    db: B,
    client: C,
}

impl<B: Debug, C> Debug for EnrichmentHandler<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnrichmentHandler ({:?})", self.db)
    }
}

impl<B, C> EnrichmentHandler<B, C>
where
    B: LedgerManagement,
    C: AccrualClient,
{
    pub fn new(db: B, client: C) -> Self {
        Self { db, client }
    }

    async fn apply(&self, order: Order, state: AccrualState) -> JobOutcome {
        let number = &order.order_number;
        if state.order != number.as_str() {
            warn!("🔁️ Asked about order {number}, but the accrual service answered about #{}", state.order);
            return JobOutcome::Failed;
        }
        if state.status == order.status {
            trace!("🔁️ Order {number} is still {}", order.status);
            return JobOutcome::Unchanged;
        }
        let accrual = if state.status == OrderStatusType::Processed {
            match state.accrual.map(MinorUnits::try_from_major).transpose() {
                Ok(Some(accrual)) if !accrual.is_negative() => accrual,
                Ok(Some(accrual)) => {
                    warn!("🔁️ The accrual service reported a negative accrual ({accrual}) for {number}. Ignoring it.");
                    return JobOutcome::Failed;
                },
                Ok(None) => MinorUnits::default(),
                Err(e) => {
                    warn!("🔁️ Could not read the accrual for {number}: {e}");
                    return JobOutcome::Failed;
                },
            }
        } else {
            MinorUnits::default()
        };
        match self.db.apply_reconciliation_result(order.id, order.user_id, state.status, accrual).await {
            Ok(ReconciliationOutcome::Applied { credited }) => {
                info!("🔁️ Order {number} is now {}. Credited {credited} to user {}", state.status, order.user_id);
                JobOutcome::Applied
            },
            Ok(ReconciliationOutcome::Skipped { current }) => {
                debug!("🔁️ Order {number} is {current}. Not moving it to {}", state.status);
                JobOutcome::Unchanged
            },
            Ok(ReconciliationOutcome::OrderNotFound) => {
                warn!("🔁️ Order {number} has disappeared from the ledger");
                JobOutcome::Failed
            },
            Err(e) => {
                warn!("🔁️ Could not record the new status of {number}. Will try again next cycle. {e}");
                JobOutcome::Failed
            },
        }
    }
}

impl<B, C> PackHandler for EnrichmentHandler<B, C>
where
    B: LedgerManagement,
    C: AccrualClient,
{
    type Error = B::Error;
    type Job = Order;

    fn name(&self) -> &'static str {
        "enrichment"
    }

    async fn fetch_pack(&self, limit: i64) -> Result<Vec<Order>, Self::Error> {
        self.db.fetch_pending_orders(limit).await
    }

    async fn handle_job(&self, order: Order, throttle: &Throttle) -> JobOutcome {
        match self.client.order_state(&order.order_number).await {
            Ok(AccrualResponse::Known(state)) => self.apply(order, state).await,
            Ok(AccrualResponse::NotYetKnown) => {
                trace!("🔁️ The accrual service does not know {} yet", order.order_number);
                JobOutcome::Deferred
            },
            Ok(AccrualResponse::RateLimited { retry_after }) => {
                warn!("🔁️ The accrual service is rate limiting us (retry after {retry_after:?})");
                throttle.engage(retry_after);
                JobOutcome::RateLimited
            },
            Err(e) => {
                warn!("🔁️ Could not query the accrual service about {}. {e}", order.order_number);
                JobOutcome::Failed
            },
        }
    }
}
