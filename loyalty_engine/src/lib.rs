//! Loyalty Engine
//!
//! The engine reconciles purchase orders uploaded to the mart against an external accrual (reward calculation)
//! service, and credits the resulting rewards to each user's balance. It also contains the accrual service's own
//! calculation engine, which matches receipts against a set of product reward rules.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`]). SQLite is the supported backend. The contracts are the [`LedgerManagement`] and
//!    [`AccrualManagement`] traits. The types that are stored are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`LedgerApi`] and [`AccrualApi`]). These validate client input and should be used in preference
//!    to calling the storage traits directly.
//! 3. The reward matcher ([`mod@matcher`]), a pure function of a receipt and a rule set.
//! 4. The periodic reconciliation engine ([`mod@reconciler`]), which drives both services' background work.
mod api;
mod db;

pub mod accrual_client;
pub mod db_types;
pub mod matcher;
pub mod reconciler;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    accrual_api::{AccrualApi, MIN_MATCH_LENGTH},
    accrual_objects,
    errors::{AccrualApiError, LedgerApiError},
    ledger_api::LedgerApi,
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    AccrualManagement,
    InsertResult,
    LedgerManagement,
    ReconciliationOutcome,
    RegisterOrderResult,
    WithdrawResult,
};
