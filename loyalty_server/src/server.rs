use std::{net::TcpListener, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use loyalty_engine::{accrual_client::HttpAccrualClient, AccrualApi, LedgerApi, SqliteDatabase};

use crate::{
    accrual_routes::accrual_routes,
    config::{AccrualServiceConfig, MartConfig},
    errors::ServerError,
    rate_limit::RateLimiter,
    routes::mart_routes,
    workers::{start_calculation_worker, start_enrichment_worker},
};

const DB_CONNECTIONS: u32 = 25;

async fn open_database(url: &str) -> Result<SqliteDatabase, ServerError> {
    let db = SqliteDatabase::new_with_url(url, DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not open {url}. {e}")))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate {url}. {e}")))?;
    info!("🚀️ Database {url} is ready");
    Ok(db)
}

/// Runs the mart until the server is shut down (e.g. with Ctrl-C), then stops the enrichment worker.
pub async fn run_mart_server(config: MartConfig) -> Result<(), ServerError> {
    let db = open_database(&config.database_url).await?;
    let client = HttpAccrualClient::new(&config.accrual_url, config.accrual_timeout)
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    info!("🚀️ Using the accrual service at {}", client.base_url());
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let srv = create_mart_instance(listener, db.clone())?;
    let worker = start_enrichment_worker(db.clone(), client, &config.engine);
    let result = srv.await;
    info!("🚀️ Server has stopped. Waiting for the enrichment worker to finish");
    worker.stop().await;
    db.close().await;
    result.map_err(ServerError::from)
}

pub fn create_mart_instance(listener: TcpListener, db: SqliteDatabase) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let ledger_api = LedgerApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("loyalty::access_log"))
            .app_data(web::Data::new(ledger_api))
            .configure(mart_routes::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .listen(listener)?
    .run();
    Ok(srv)
}

/// Runs the accrual service until the server is shut down, then stops the calculation worker.
pub async fn run_accrual_server(config: AccrualServiceConfig) -> Result<(), ServerError> {
    let db = open_database(&config.database_url).await?;
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let srv = create_accrual_instance(listener, db.clone(), config.max_requests_per_minute)?;
    let worker = start_calculation_worker(db.clone(), &config.engine);
    let result = srv.await;
    info!("🚀️ Server has stopped. Waiting for the calculation worker to finish");
    worker.stop().await;
    db.close().await;
    result.map_err(ServerError::from)
}

pub fn create_accrual_instance(
    listener: TcpListener,
    db: SqliteDatabase,
    max_requests_per_minute: u32,
) -> Result<Server, ServerError> {
    if max_requests_per_minute > 0 {
        info!("🚀️ Reward queries are limited to {max_requests_per_minute} per minute");
    }
    // One limiter for the whole server, rather than one per worker thread
    let limiter = web::Data::new(RateLimiter::per_minute(max_requests_per_minute));
    let srv = HttpServer::new(move || {
        let accrual_api = AccrualApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("accrual::access_log"))
            .app_data(web::Data::new(accrual_api))
            .app_data(limiter.clone())
            .configure(accrual_routes::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .listen(listener)?
    .run();
    Ok(srv)
}
