use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    accrual_client::{AccrualClient, AccrualClientError, AccrualResponse, AccrualState},
    db_types::{OrderNumber, OrderStatusType},
};

/// An in-process stand-in for the accrual service.
///
/// Each order number has a queue of scripted replies. The last reply in a queue is repeated forever. Orders with no
/// script get `204 No Content`. A global rate limit can be switched on to answer every call with `429`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAccrualClient {
    inner: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    scripts: HashMap<String, VecDeque<AccrualResponse>>,
    rate_limit: Option<Option<Duration>>,
    calls: Vec<String>,
}

impl ScriptedAccrualClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, order_number: &str, response: AccrualResponse) {
        let mut state = self.inner.lock().unwrap();
        state.scripts.entry(order_number.to_string()).or_default().push_back(response);
    }

    pub fn push_state(&self, order_number: &str, status: OrderStatusType, accrual: Option<f64>) {
        let state = AccrualState { order: order_number.to_string(), status, accrual };
        self.push_response(order_number, AccrualResponse::Known(state));
    }

    pub fn set_rate_limited(&self, retry_after: Option<Duration>) {
        self.inner.lock().unwrap().rate_limit = Some(retry_after);
    }

    pub fn clear_rate_limit(&self) {
        self.inner.lock().unwrap().rate_limit = None;
    }

    /// Every order number queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn reset_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }
}

impl AccrualClient for ScriptedAccrualClient {
    async fn order_state(&self, order_number: &OrderNumber) -> Result<AccrualResponse, AccrualClientError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(order_number.as_str().to_string());
        if let Some(retry_after) = state.rate_limit {
            return Ok(AccrualResponse::RateLimited { retry_after });
        }
        let response = match state.scripts.get_mut(order_number.as_str()) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or(AccrualResponse::NotYetKnown))
    }
}
