use log::*;
use loyalty_engine::{
    accrual_client::AccrualClient,
    reconciler::{CalculationHandler, EngineHandle, EnrichmentHandler, ReconciliationEngine},
    AccrualManagement,
    LedgerManagement,
};

use crate::config::EngineSettings;

/// Starts the mart's enrichment worker, which asks the accrual service about pending orders and credits the results.
/// The worker runs until the returned handle is stopped.
pub fn start_enrichment_worker<B, C>(db: B, client: C, settings: &EngineSettings) -> EngineHandle
where
    B: LedgerManagement,
    C: AccrualClient,
{
    info!("🔁️ Starting the enrichment worker with {} workers every {:?}", settings.pool_size, settings.period);
    ReconciliationEngine::new(EnrichmentHandler::new(db, client), settings.engine_config()).start()
}

/// Starts the accrual service's calculation worker, which runs the reward matcher over newly registered receipts.
pub fn start_calculation_worker<B: AccrualManagement>(db: B, settings: &EngineSettings) -> EngineHandle {
    info!("🔁️ Starting the calculation worker with {} workers every {:?}", settings.pool_size, settings.period);
    ReconciliationEngine::new(CalculationHandler::new(db), settings.engine_config()).start()
}
