//! The accrual service's public API: reward rules, receipt registration and order state queries.

use std::fmt::Debug;

use log::{debug, info};
use loyalty_common::MinorUnits;

use crate::{
    accrual_client::AccrualState,
    api::{
        accrual_objects::{GoodsItem, RewardRuleRequest},
        errors::AccrualApiError,
    },
    db::traits::{AccrualManagement, InsertResult},
    db_types::{NewRewardRule, OrderNumber, OrderStatusType, Receipt, ReceiptLine, RewardRule, RewardType},
};

pub const MIN_MATCH_LENGTH: usize = 3;

pub struct AccrualApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccrualApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualApi ({:?})", self.db)
    }
}

impl<B> AccrualApi<B>
where B: AccrualManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Adds a reward rule. Rewards are stored in hundredths, so a 7.5% rule is stored as 750 and a 3.25pt rule as 325.
    pub async fn register_rule(&self, request: RewardRuleRequest) -> Result<InsertResult, AccrualApiError> {
        let match_text = request.match_text;
        if match_text.chars().count() < MIN_MATCH_LENGTH {
            return Err(AccrualApiError::InvalidRule(format!(
                "The match text must be at least {MIN_MATCH_LENGTH} characters long"
            )));
        }
        let reward_type =
            request.reward_type.parse::<RewardType>().map_err(|e| AccrualApiError::InvalidRule(e.to_string()))?;
        let reward = MinorUnits::try_from_major(request.reward).map_err(|e| AccrualApiError::InvalidRule(e.to_string()))?;
        if reward.is_negative() {
            return Err(AccrualApiError::InvalidRule(format!("The reward for '{match_text}' is negative")));
        }
        let rule = NewRewardRule { match_text, reward: reward.value(), reward_type };
        self.db.register_rule(rule).await.map_err(db_error)
    }

    pub async fn delete_rule(&self, match_text: &str) -> Result<bool, AccrualApiError> {
        self.db.delete_rule(match_text).await.map_err(db_error)
    }

    pub async fn active_rules(&self) -> Result<Vec<RewardRule>, AccrualApiError> {
        self.db.fetch_active_rules().await.map_err(db_error)
    }

    /// Registers a receipt for later reward calculation. Prices must be finite and non-negative.
    pub async fn register_receipt(&self, order: &str, goods: Vec<GoodsItem>) -> Result<InsertResult, AccrualApiError> {
        let order_number = order.parse::<OrderNumber>()?;
        let lines = goods
            .into_iter()
            .map(|item| {
                let price = MinorUnits::try_from_major(item.price)
                    .map_err(|e| AccrualApiError::InvalidReceipt(format!("'{}': {e}", item.description)))?;
                if price.is_negative() {
                    return Err(AccrualApiError::InvalidReceipt(format!("'{}' has a negative price", item.description)));
                }
                Ok(ReceiptLine::new(item.description, price))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let receipt = Receipt { order_number, lines };
        let result = self.db.register_receipt(receipt).await.map_err(db_error)?;
        match result {
            InsertResult::Inserted(id) => info!("🧮️ Receipt for order {order} registered with id {id}"),
            InsertResult::AlreadyExists(id) => debug!("🧮️ Receipt for order {order} already exists with id {id}"),
        }
        Ok(result)
    }

    /// The state of an order as reported to the mart. Unknown and malformed order numbers both return `None`.
    pub async fn order_state(&self, order: &str) -> Result<Option<AccrualState>, AccrualApiError> {
        let Ok(order_number) = order.parse::<OrderNumber>() else {
            return Ok(None);
        };
        let order = self.db.fetch_accrual_order(&order_number).await.map_err(db_error)?;
        Ok(order.map(|o| {
            let accrual = (o.status == OrderStatusType::Processed).then(|| o.accrual.to_major());
            AccrualState { order: o.order_number.as_str().to_string(), status: o.status, accrual }
        }))
    }
}

fn db_error<E: std::error::Error>(e: E) -> AccrualApiError {
    AccrualApiError::DatabaseError(e.to_string())
}
