use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use cucumber::World;
use log::*;
use loyalty_engine::{
    accrual_client::{AccrualClient, AccrualClientError, AccrualResponse},
    db_types::OrderNumber,
    reconciler::{CalculationHandler, CycleReport, EngineConfig, EnrichmentHandler, ReconciliationEngine},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    AccrualApi,
    LedgerApi,
    RegisterOrderResult,
    SqliteDatabase,
    WithdrawResult,
};

pub const PERIOD: Duration = Duration::from_millis(3000);
pub const COOLDOWN: Duration = Duration::from_millis(10_000);
pub const POOL_SIZE: usize = 3;

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
    pub last_upload: Option<RegisterOrderResult>,
    pub last_withdrawal: Option<WithdrawResult>,
    pub last_report: Option<CycleReport>,
}

impl LoyaltyWorld {
    pub fn system(&self) -> &LoyaltySystem {
        self.system.as_ref().expect("The system has not been initialised")
    }
}

/// Talks to the accrual service's API directly, in-process, in place of HTTP.
#[derive(Clone)]
pub struct InProcessAccrualClient {
    api: Arc<AccrualApi<SqliteDatabase>>,
    rate_limit: Arc<Mutex<Option<Option<Duration>>>>,
    calls: Arc<AtomicUsize>,
}

impl InProcessAccrualClient {
    pub fn set_rate_limit(&self, retry_after: Option<Option<Duration>>) {
        *self.rate_limit.lock().unwrap() = retry_after;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

impl AccrualClient for InProcessAccrualClient {
    async fn order_state(&self, order_number: &OrderNumber) -> Result<AccrualResponse, AccrualClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rate_limit = *self.rate_limit.lock().unwrap();
        if let Some(retry_after) = rate_limit {
            return Ok(AccrualResponse::RateLimited { retry_after });
        }
        let state = self
            .api
            .order_state(order_number.as_str())
            .await
            .map_err(|e| AccrualClientError::Decode(e.to_string()))?;
        Ok(state.map(AccrualResponse::Known).unwrap_or(AccrualResponse::NotYetKnown))
    }
}

pub struct LoyaltySystem {
    pub mart_db_path: String,
    pub accrual_db_path: String,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub accrual: Arc<AccrualApi<SqliteDatabase>>,
    pub client: InProcessAccrualClient,
    pub enrichment: ReconciliationEngine<EnrichmentHandler<SqliteDatabase, InProcessAccrualClient>>,
    pub calculation: ReconciliationEngine<CalculationHandler<SqliteDatabase>>,
}

impl Debug for LoyaltySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltySystem (mart: {}, accrual: {})", self.mart_db_path, self.accrual_db_path)
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let mart_db_path = prepare_test_env().await;
        let accrual_db_path = prepare_test_env().await;
        let mart_db = SqliteDatabase::new_with_url(&mart_db_path, 5).await.expect("Error connecting to mart database");
        let accrual_db =
            SqliteDatabase::new_with_url(&accrual_db_path, 5).await.expect("Error connecting to accrual database");
        debug!("Created databases: {mart_db_path}, {accrual_db_path}");
        let accrual = Arc::new(AccrualApi::new(accrual_db.clone()));
        let client = InProcessAccrualClient {
            api: Arc::clone(&accrual),
            rate_limit: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let config = EngineConfig { period: PERIOD, cooldown: COOLDOWN, pack_limit: 25, pool_size: POOL_SIZE };
        let enrichment =
            ReconciliationEngine::new(EnrichmentHandler::new(mart_db.clone(), client.clone()), config.clone());
        let calculation =
            ReconciliationEngine::new(CalculationHandler::new(accrual_db), EngineConfig { pool_size: 1, ..config });
        let ledger = LedgerApi::new(mart_db);
        Self { mart_db_path, accrual_db_path, ledger, accrual, client, enrichment, calculation }
    }

    pub async fn close(&self) {
        self.ledger.db().close().await;
        self.accrual.db().close().await;
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
