use std::fmt::Debug;

use log::*;
use loyalty_common::MinorUnits;
use sqlx::SqlitePool;

use super::{accrual_orders, new_pool, orders, reward_rules, user_accounts, withdrawals, SqliteDatabaseError};
use crate::{
    db::traits::{
        AccrualManagement,
        InsertResult,
        LedgerManagement,
        ReconciliationOutcome,
        RegisterOrderResult,
        WithdrawResult,
    },
    db_types::{
        AccrualOrder,
        NewRewardRule,
        NewWithdrawal,
        Order,
        OrderNumber,
        OrderStatusType,
        Receipt,
        RewardRule,
        UserAccount,
        Withdrawal,
    },
};

/// SQLite storage for both the mart ledger and the accrual service. Each service opens its own database file.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl LedgerManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn register_order(
        &self,
        order_number: &OrderNumber,
        user_id: i64,
    ) -> Result<RegisterOrderResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        // Write first, so that the transaction takes the write lock before it reads anything.
        let result = match orders::insert_order_if_absent(order_number, user_id, &mut tx).await? {
            Some(id) => {
                // Users only get an account once they own an order
                user_accounts::ensure_account(user_id, &mut tx).await?;
                RegisterOrderResult::Registered(id)
            },
            None => {
                let existing = orders::fetch_order_by_number(order_number, &mut tx).await?.ok_or_else(|| {
                    SqliteDatabaseError::QueryError(format!("Order {order_number} conflicted, but could not be found"))
                })?;
                if existing.user_id == user_id {
                    RegisterOrderResult::AlreadyOwnedBySameUser(existing.id)
                } else {
                    debug!("🗃️ User {user_id} tried to upload {order_number}, which belongs to {}", existing.user_id);
                    RegisterOrderResult::OwnedByOtherUser
                }
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_pending_orders(&self, limit: i64) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_with_status(&OrderStatusType::PENDING, limit, &mut conn).await
    }

    async fn apply_reconciliation_result(
        &self,
        order_id: i64,
        user_id: i64,
        status: OrderStatusType,
        accrual: MinorUnits,
    ) -> Result<ReconciliationOutcome, Self::Error> {
        if accrual.is_negative() {
            return Err(SqliteDatabaseError::InvalidAmount(format!("Accrual for order {order_id} is negative")));
        }
        let mut tx = self.pool.begin().await?;
        let allowed = status.allowed_predecessors();
        let owner = orders::update_order_status(order_id, status, accrual, &allowed, &mut tx).await?;
        let Some(owner) = owner else {
            let current = orders::fetch_order_by_id(order_id, &mut tx).await?;
            tx.rollback().await?;
            return Ok(match current {
                Some(order) => ReconciliationOutcome::Skipped { current: order.status },
                None => ReconciliationOutcome::OrderNotFound,
            });
        };
        if owner != user_id {
            warn!("🗃️ Order {order_id} belongs to user {owner}, not {user_id}. Crediting the owner.");
        }
        let credited = if status == OrderStatusType::Processed {
            user_accounts::credit_balance(owner, accrual, &mut tx).await?;
            accrual
        } else {
            MinorUnits::default()
        };
        tx.commit().await?;
        debug!("🗃️ Order {order_id} is now {status}. {credited} credited to user {owner}");
        Ok(ReconciliationOutcome::Applied { credited })
    }

    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<WithdrawResult, Self::Error> {
        if withdrawal.amount <= MinorUnits::default() {
            return Err(SqliteDatabaseError::InvalidAmount(format!(
                "Withdrawal amounts must be positive, got {}",
                withdrawal.amount
            )));
        }
        let mut tx = self.pool.begin().await?;
        let user_id = withdrawal.user_id;
        if !user_accounts::try_debit_balance(user_id, withdrawal.amount, &mut tx).await? {
            let balance =
                user_accounts::user_account_by_id(user_id, &mut tx).await?.map(|a| a.balance).unwrap_or_default();
            tx.rollback().await?;
            debug!("🗃️ User {user_id} cannot withdraw {}. The balance is only {balance}", withdrawal.amount);
            return Ok(WithdrawResult::InsufficientFunds { balance });
        }
        withdrawals::insert_withdrawal(&withdrawal, &mut tx).await?;
        let account = user_accounts::user_account_by_id(user_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::AccountNotFound(user_id))?;
        tx.commit().await?;
        Ok(WithdrawResult::Completed(account))
    }

    async fn fetch_user_orders(&self, user_id: i64) -> Result<Option<Vec<Order>>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        if user_accounts::user_account_by_id(user_id, &mut conn).await?.is_none() {
            return Ok(None);
        }
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(Some(orders))
    }

    async fn fetch_user_balance(&self, user_id: i64) -> Result<Option<UserAccount>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        user_accounts::user_account_by_id(user_id, &mut conn).await
    }

    async fn fetch_user_withdrawals(&self, user_id: i64) -> Result<Option<Vec<Withdrawal>>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        if user_accounts::user_account_by_id(user_id, &mut conn).await?.is_none() {
            return Ok(None);
        }
        let withdrawals = withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(Some(withdrawals))
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(order_number, &mut conn).await
    }
}

impl AccrualManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn register_rule(&self, rule: NewRewardRule) -> Result<InsertResult, Self::Error> {
        if rule.reward < 0 {
            return Err(SqliteDatabaseError::InvalidAmount(format!("Reward for '{}' is negative", rule.match_text)));
        }
        // The insert must be committed before returning, or other connections in the pool may not see the rule yet
        let mut tx = self.pool.begin().await?;
        let result = reward_rules::idempotent_insert(&rule, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn delete_rule(&self, match_text: &str) -> Result<bool, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let deleted = reward_rules::soft_delete(match_text, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn fetch_active_rules(&self) -> Result<Vec<RewardRule>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        reward_rules::fetch_active(&mut conn).await
    }

    async fn register_receipt(&self, receipt: Receipt) -> Result<InsertResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = accrual_orders::idempotent_insert(&receipt, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_pending_receipts(&self, limit: i64) -> Result<Vec<AccrualOrder>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        accrual_orders::fetch_pending(limit, &mut conn).await
    }

    async fn update_accrual_order(
        &self,
        id: i64,
        status: OrderStatusType,
        accrual: MinorUnits,
    ) -> Result<ReconciliationOutcome, Self::Error> {
        if accrual.is_negative() {
            return Err(SqliteDatabaseError::InvalidAmount(format!("Accrual for receipt {id} is negative")));
        }
        let mut tx = self.pool.begin().await?;
        let allowed = status.allowed_predecessors();
        let outcome = if accrual_orders::update_status(id, status, accrual, &allowed, &mut tx).await? {
            ReconciliationOutcome::Applied { credited: MinorUnits::default() }
        } else {
            match accrual_orders::fetch_status(id, &mut tx).await? {
                Some(current) => ReconciliationOutcome::Skipped { current },
                None => ReconciliationOutcome::OrderNotFound,
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn fetch_accrual_order(&self, order_number: &OrderNumber) -> Result<Option<AccrualOrder>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        accrual_orders::fetch_accrual_order(order_number, &mut conn).await
    }
}
