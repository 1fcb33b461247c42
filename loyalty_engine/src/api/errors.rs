use thiserror::Error;

use crate::db_types::OrderNumberError;

#[derive(Debug, Clone, Error)]
pub enum LedgerApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(#[from] OrderNumberError),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("A withdrawal must name the order it pays for")]
    MissingOrderReference,
}

#[derive(Debug, Clone, Error)]
pub enum AccrualApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(#[from] OrderNumberError),
    #[error("Invalid reward rule: {0}")]
    InvalidRule(String),
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),
}
