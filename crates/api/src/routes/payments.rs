//! Payment intent and gateway-callback verification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use domain::booking::{Contact, CustomerId, LineItem, Money};
use event_store::EventStore;
use fulfillment::{PaymentIntent, VerificationRequest};
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::error::ApiError;
use crate::routes::bookings::{
    AppState, BookingResponse, ContactRequest, LineItemRequest,
};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub contact: ContactRequest,
    pub items: Vec<LineItemRequest>,
    pub total_cents: i64,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub payment_record_id: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub gateway_order_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_record_id: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingResponse>,
}

// -- Handlers --

/// POST /payments/order — opens a gateway order for an online payment.
///
/// No booking exists yet; one is created only when the callback verifies.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let actor = state.actor(&headers)?;
    let customer_id = match (&req.customer_id, &actor) {
        (Some(id_str), _) => {
            let uuid = uuid::Uuid::parse_str(id_str)
                .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
            Some(CustomerId::from_uuid(uuid))
        }
        (None, Actor::Customer { id, .. }) => Some(*id),
        _ => None,
    };

    let intent = PaymentIntent {
        customer_id,
        contact: Contact::new(
            req.contact.name,
            req.contact.email,
            req.contact.phone,
            req.contact.address,
        ),
        items: req
            .items
            .into_iter()
            .map(|i| {
                LineItem::new(
                    i.product_id,
                    i.product_name,
                    i.quantity,
                    Money::from_cents(i.unit_price_cents),
                )
            })
            .collect(),
        total_amount: Money::from_cents(req.total_cents),
    };

    let order = state.reconciler.create_order(intent).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            gateway_order_id: order.gateway_order_id,
            amount_cents: order.amount.cents(),
            currency: order.currency,
            payment_record_id: order.payment_record_id.to_string(),
        }),
    ))
}

/// POST /payments/verify — gateway callback with the signed payment result.
///
/// A failed signature persists the payment as `failed` and answers 400 with
/// `success: false`; repeats of a settled callback answer with the recorded
/// outcome.
#[tracing::instrument(skip(state, req), fields(gateway_order_id = %req.gateway_order_id))]
pub async fn verify<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>), ApiError> {
    let payment_record_id = {
        let uuid = uuid::Uuid::parse_str(&req.payment_record_id)
            .map_err(|e| ApiError::BadRequest(format!("Invalid payment_record_id: {e}")))?;
        common::AggregateId::from(uuid)
    };

    let outcome = state
        .reconciler
        .verify(
            payment_record_id,
            VerificationRequest {
                gateway_order_id: req.gateway_order_id,
                gateway_payment_id: req.gateway_payment_id,
                signature: req.signature,
            },
        )
        .await?;

    if !outcome.verified {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyResponse {
                success: false,
                booking: None,
            }),
        ));
    }

    let booking = match outcome.booking_id {
        Some(booking_id) => state
            .coordinator
            .bookings()
            .get_booking(booking_id)
            .await?
            .map(|b| BookingResponse::from_aggregate(&b)),
        None => None,
    };

    Ok((
        StatusCode::OK,
        Json(VerifyResponse {
            success: true,
            booking,
        }),
    ))
}
