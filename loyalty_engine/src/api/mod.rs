pub mod accrual_api;
pub mod accrual_objects;
pub mod errors;
pub mod ledger_api;
