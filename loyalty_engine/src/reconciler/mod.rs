//! # The periodic reconciliation engine
//!
//! Both services run the same loop. Once per period a dispatcher fetches a bounded pack of unresolved orders, fans it
//! out over a job channel to a fixed pool of workers, and waits for the pool to drain before scheduling the next cycle.
//!
//! * In the mart, [`EnrichmentHandler`] asks the accrual service about each order and commits the answer to the ledger.
//! * In the accrual service, [`CalculationHandler`] runs the reward matcher over each registered receipt.
//!
//! A shared [`Throttle`] lets any worker signal that the remote side is rate limiting. Once it is set, the dispatcher
//! stops pushing jobs, the remaining workers skip theirs, and the next cycle waits out a cooldown instead of the normal
//! period.
mod calculation;
mod engine;
mod enrichment;
mod throttle;

pub use calculation::{CalculationHandler, CalculationJob};
pub use engine::{CycleReport, EngineConfig, EngineHandle, JobOutcome, PackHandler, ReconciliationEngine};
pub use enrichment::EnrichmentHandler;
pub use throttle::Throttle;
