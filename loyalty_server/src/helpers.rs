use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::*;

use crate::errors::ServerError;

/// The header an upstream authentication gateway uses to tell the mart who is calling.
pub const USER_ID_HEADER: &str = "loyalty_user_id";

/// The id of the user making a mart request, taken from the [`USER_ID_HEADER`] header.
///
/// Handlers that take a `UserId` argument reply `401 Unauthorized` when the header is missing or is not a positive
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

impl FromRequest for UserId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(get_user_id(req).map(UserId))
    }
}

pub fn get_user_id(req: &HttpRequest) -> Result<i64, ServerError> {
    let value = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| ServerError::Unauthenticated(format!("The {USER_ID_HEADER} header is missing")))?;
    let id = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ServerError::Unauthenticated(format!("{value:?} is not a valid user id")))?;
    trace!("💻️ Request made by user {id}");
    Ok(id)
}
