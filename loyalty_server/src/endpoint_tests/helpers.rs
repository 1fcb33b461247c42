use std::fmt::Debug;

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
};
use log::debug;

/// Sends a request to a test service and returns the status and body text.
pub async fn send<S, R, B, E>(app: &S, req: R) -> (StatusCode, String)
where
    S: Service<R, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: Debug,
{
    let res = test::call_service(app, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let body = String::from_utf8_lossy(&body).into_owned();
    debug!("Response: {status} {body}");
    (status, body)
}

pub fn parse_json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("Response was not valid JSON")
}
