//! #  Storage backends.
//!
//! The engine is written against two storage contracts, one for each service:
//!
//! * [`LedgerManagement`] is the mart's order ledger. It owns user accounts, uploaded orders and withdrawals, and is the
//!   only place where balances change.
//! * [`AccrualManagement`] is the accrual service's store of registered receipts and reward rules.
//!
//! Every mutating operation is atomic. Either all of its effects are visible to later readers, or none are. Backends
//! must also be safe to call from many workers at once; the reconciliation engine relies on that.
mod accrual_management;
mod data_objects;
mod ledger_management;

pub use accrual_management::AccrualManagement;
pub use data_objects::{InsertResult, ReconciliationOutcome, RegisterOrderResult, WithdrawResult};
pub use ledger_management::LedgerManagement;
