use std::time::Duration;

use actix_web::{
    error::ResponseError,
    http::{
        header::{ContentType, RETRY_AFTER},
        StatusCode,
    },
    HttpResponse,
};
use loyalty_engine::{db_types::OrderNumberError, AccrualApiError, LedgerApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("No user id was provided, or it was invalid. {0}")]
    Unauthenticated(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(String),
    #[error("The order has already been uploaded by another user.")]
    OrderOwnedByOtherUser,
    #[error("{0} already exists.")]
    Conflict(String),
    #[error("Insufficient funds. The current balance is {0}.")]
    InsufficientFunds(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Too many requests. Try again in {} seconds.", .0.as_secs())]
    TooManyRequests(Duration),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderOwnedByOtherUser => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let Self::TooManyRequests(retry_after) = self {
            response.insert_header((RETRY_AFTER, retry_after.as_secs().to_string()));
        }
        response.insert_header(ContentType::json()).body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Mart semantics: a number that is not a number at all is a bad request; a number that fails its check digit is
/// unprocessable.
impl From<LedgerApiError> for ServerError {
    fn from(e: LedgerApiError) -> Self {
        match e {
            LedgerApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            LedgerApiError::InvalidOrderNumber(e @ OrderNumberError::FailedChecksum) => {
                Self::InvalidOrderNumber(e.to_string())
            },
            LedgerApiError::InvalidOrderNumber(e) => Self::InvalidRequestBody(e.to_string()),
            LedgerApiError::InvalidAmount(e) => Self::InvalidRequestBody(e),
            e @ LedgerApiError::MissingOrderReference => Self::InvalidOrderNumber(e.to_string()),
        }
    }
}

/// The accrual service rejects every kind of malformed input with a plain bad request.
impl From<AccrualApiError> for ServerError {
    fn from(e: AccrualApiError) -> Self {
        match e {
            AccrualApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AccrualApiError::InvalidOrderNumber(e) => Self::InvalidRequestBody(e.to_string()),
            AccrualApiError::InvalidRule(e) => Self::InvalidRequestBody(e),
            AccrualApiError::InvalidReceipt(e) => Self::InvalidRequestBody(e),
        }
    }
}
