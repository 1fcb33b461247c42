//! The mart's public ledger API.
//!
//! Client-supplied order numbers and decimal amounts are validated and converted here, before anything reaches the
//! store.

use std::fmt::Debug;

use log::{debug, info};
use loyalty_common::MinorUnits;

use crate::{
    api::errors::LedgerApiError,
    db::traits::{LedgerManagement, RegisterOrderResult, WithdrawResult},
    db_types::{NewWithdrawal, Order, OrderNumber, UserAccount, Withdrawal},
};

pub struct LedgerApi<B> {
    db: B,
}

impl<B: Debug> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi ({:?})", self.db)
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Uploads an order number on behalf of a user.
    pub async fn register_order(&self, order_number: &str, user_id: i64) -> Result<RegisterOrderResult, LedgerApiError> {
        let order_number = order_number.parse::<OrderNumber>()?;
        let result = self.db.register_order(&order_number, user_id).await.map_err(db_error)?;
        if let RegisterOrderResult::Registered(id) = result {
            info!("💻️ User {user_id} uploaded order {order_number} (id {id})");
        }
        Ok(result)
    }

    /// Withdraws `sum` (in major units) from the user's balance against the given order reference. The reference is
    /// free-form and need not match an uploaded order, but it may not be blank.
    pub async fn withdraw(&self, user_id: i64, order_number: &str, sum: f64) -> Result<WithdrawResult, LedgerApiError> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(LedgerApiError::MissingOrderReference);
        }
        let amount = MinorUnits::try_from_major(sum).map_err(|e| LedgerApiError::InvalidAmount(e.to_string()))?;
        if amount <= MinorUnits::default() {
            return Err(LedgerApiError::InvalidAmount(format!("Withdrawals must be positive, got {sum}")));
        }
        let withdrawal = NewWithdrawal::new(user_id, order_number.to_string(), amount);
        let result = self.db.withdraw(withdrawal).await.map_err(db_error)?;
        match &result {
            WithdrawResult::Completed(acc) => {
                info!("💻️ User {user_id} withdrew {amount} against {order_number}. New balance {}", acc.balance)
            },
            WithdrawResult::InsufficientFunds { balance } => {
                debug!("💻️ User {user_id} has {balance}, and cannot withdraw {amount}")
            },
        }
        Ok(result)
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Option<Vec<Order>>, LedgerApiError> {
        self.db.fetch_user_orders(user_id).await.map_err(db_error)
    }

    pub async fn balance_for_user(&self, user_id: i64) -> Result<Option<UserAccount>, LedgerApiError> {
        self.db.fetch_user_balance(user_id).await.map_err(db_error)
    }

    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Option<Vec<Withdrawal>>, LedgerApiError> {
        self.db.fetch_user_withdrawals(user_id).await.map_err(db_error)
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, LedgerApiError> {
        let order_number = order_number.parse::<OrderNumber>()?;
        self.db.fetch_order_by_number(&order_number).await.map_err(db_error)
    }
}

fn db_error<E: std::error::Error>(e: E) -> LedgerApiError {
    LedgerApiError::DatabaseError(e.to_string())
}
