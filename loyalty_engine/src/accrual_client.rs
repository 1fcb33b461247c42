//! The mart's view of the accrual service.
//!
//! The accrual service answers `GET /api/orders/{number}` with one of:
//! * `200 OK` and a JSON body describing the order's state,
//! * `204 No Content` when it does not know the order (yet),
//! * `429 Too Many Requests`, optionally with a `Retry-After` header in seconds.
use std::{future::Future, time::Duration};

use log::trace;
use reqwest::{header::RETRY_AFTER, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{OrderNumber, OrderStatusType};

/// The body of a `200 OK` response from the accrual service.
///
/// `accrual` is in major units and is only present for `PROCESSED` orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualState {
    pub order: String,
    pub status: OrderStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccrualResponse {
    Known(AccrualState),
    /// `204`: the accrual service has no information about the order at this time.
    NotYetKnown,
    /// `429`: the accrual service wants callers to back off.
    RateLimited { retry_after: Option<Duration> },
}

#[derive(Debug, Error)]
pub enum AccrualClientError {
    #[error("Could not reach the accrual service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The accrual service replied with unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("Could not decode the accrual service response: {0}")]
    Decode(String),
    #[error("Invalid accrual service configuration: {0}")]
    Configuration(String),
}

/// Anything that can tell the mart how an order stands with the accrual service.
pub trait AccrualClient: Clone + Send + Sync + 'static {
    fn order_state(
        &self,
        order_number: &OrderNumber,
    ) -> impl Future<Output = Result<AccrualResponse, AccrualClientError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpAccrualClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAccrualClient {
    /// `base_url` may be given with or without a scheme (`localhost:8081` is the same as `http://localhost:8081`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AccrualClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(AccrualClientError::Configuration("The accrual service address is empty".into()));
        }
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.to_string()
        } else {
            format!("http://{base_url}")
        };
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl AccrualClient for HttpAccrualClient {
    async fn order_state(&self, order_number: &OrderNumber) -> Result<AccrualResponse, AccrualClientError> {
        let url = format!("{}/api/orders/{}", self.base_url, order_number.as_str());
        trace!("🔁️ GET {url}");
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                serde_json::from_slice::<AccrualState>(&body)
                    .map(AccrualResponse::Known)
                    .map_err(|e| AccrualClientError::Decode(e.to_string()))
            },
            StatusCode::NO_CONTENT => Ok(AccrualResponse::NotYetKnown),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after =
                    response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()).and_then(parse_retry_after);
                Ok(AccrualResponse::RateLimited { retry_after })
            },
            status => Err(AccrualClientError::UnexpectedStatus(status.as_u16())),
        }
    }
}

/// Only the delay-seconds form of `Retry-After` is understood.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
