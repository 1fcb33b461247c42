//! # Loyalty server
//! This crate hosts the HTTP surfaces for the loyalty system. There are two binaries:
//!
//! * `loyalty_server`, the mart. Users upload purchase order numbers, check their balance and spend points. A
//!   background enrichment worker asks the accrual service about each pending order and credits the rewards.
//! * `accrual_server`, the accrual service. Partners register reward rules and receipts; a background calculation
//!   worker runs the reward matcher over each receipt, and the mart polls for the results.
//!
//! ## Configuration
//! Both servers are configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The mart exposes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/user/orders`, `GET /api/user/orders`: Upload and list orders.
//! * `GET /api/user/balance`, `POST /api/user/balance/withdraw`, `GET /api/user/withdrawals`: Balance and spending.
//!
//! The accrual service exposes:
//! * `/health`
//! * `POST /api/orders`: Register a receipt.
//! * `POST /api/goods`, `DELETE /api/goods/{match}`: Manage reward rules.
//! * `GET /api/orders/{number}`: Query an order's state.
pub mod accrual_routes;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
