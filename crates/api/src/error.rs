//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{BookingError, DomainError};
use event_store::EventStoreError;
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Valid credentials, wrong actor for the action.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Fulfillment or payment reconciliation error.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Guard violations, claim races, and lost concurrency races are all
/// client-visible 400s: the request was legal once but the booking has
/// moved on, and any retry decision belongs to the caller.
fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Booking(booking_err) => match booking_err {
            BookingError::InvalidStateTransition { .. }
            | BookingError::AlreadyClaimed
            | BookingError::AlreadyCompleted
            | BookingError::InvalidQuantity { .. }
            | BookingError::InvalidTotal { .. }
            | BookingError::MissingContact { .. }
            | BookingError::NoItems
            | BookingError::AlreadyCreated => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::AggregateNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "domain error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match err {
        FulfillmentError::InvalidProduct { .. } | FulfillmentError::SignatureMismatch => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        FulfillmentError::Payment(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        FulfillmentError::PaymentNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        FulfillmentError::Domain(domain_err) => domain_error_to_response(domain_err),
        FulfillmentError::Gateway(_)
        | FulfillmentError::EventStore(_)
        | FulfillmentError::Serialization(_) => {
            tracing::error!(error = %err, "fulfillment error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
