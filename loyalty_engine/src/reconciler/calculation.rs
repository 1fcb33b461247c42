use std::{fmt::Debug, sync::Arc};

use log::*;

use super::{JobOutcome, PackHandler, Throttle};
use crate::{
    db::traits::{AccrualManagement, ReconciliationOutcome},
    db_types::{AccrualOrder, RewardRule},
    matcher::{compute_accrual, AccrualResult},
};

/// A registered receipt, paired with the rule set that was active when its pack was fetched.
#[derive(Debug, Clone)]
pub struct CalculationJob {
    pub order: AccrualOrder,
    pub rules: Arc<[RewardRule]>,
}

/// The accrual service's reconciliation job: run the reward matcher over each registered receipt.
#[derive(Clone)]
pub struct CalculationHandler<B> {
    db: B,
}

impl<B: Debug> Debug for CalculationHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CalculationHandler ({:?})", self.db)
    }
}

impl<B: AccrualManagement> CalculationHandler<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B: AccrualManagement> PackHandler for CalculationHandler<B> {
    type Error = B::Error;
    type Job = CalculationJob;

    fn name(&self) -> &'static str {
        "calculation"
    }

    async fn fetch_pack(&self, limit: i64) -> Result<Vec<CalculationJob>, Self::Error> {
        let orders = self.db.fetch_pending_receipts(limit).await?;
        if orders.is_empty() {
            return Ok(vec![]);
        }
        let rules: Arc<[RewardRule]> = self.db.fetch_active_rules().await?.into();
        Ok(orders.into_iter().map(|order| CalculationJob { order, rules: Arc::clone(&rules) }).collect())
    }

    async fn handle_job(&self, job: CalculationJob, _throttle: &Throttle) -> JobOutcome {
        let CalculationJob { order, rules } = job;
        let result = match order.receipt_lines() {
            Ok(lines) => compute_accrual(&lines, &rules),
            Err(e) => {
                warn!("🧮️ The receipt for {} cannot be decoded. Marking it invalid. {e}", order.order_number);
                AccrualResult::invalid()
            },
        };
        match self.db.update_accrual_order(order.id, result.status, result.accrual).await {
            Ok(ReconciliationOutcome::Applied { .. }) => {
                info!("🧮️ Order {} is {} with an accrual of {}", order.order_number, result.status, result.accrual);
                JobOutcome::Applied
            },
            Ok(ReconciliationOutcome::Skipped { current }) => {
                debug!("🧮️ Order {} is already {current}", order.order_number);
                JobOutcome::Unchanged
            },
            Ok(ReconciliationOutcome::OrderNotFound) => {
                warn!("🧮️ Order {} has disappeared", order.order_number);
                JobOutcome::Failed
            },
            Err(e) => {
                warn!("🧮️ Could not record the accrual for {}. Will try again next cycle. {e}", order.order_number);
                JobOutcome::Failed
            },
        }
    }
}
