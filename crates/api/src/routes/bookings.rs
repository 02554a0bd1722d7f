//! Booking intake, lifecycle transitions, and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::AggregateId;
use domain::aggregate::Aggregate;
use domain::booking::{
    AdminUpdateBooking, AttachOwner, Booking, BookingStatus, CancelBooking, ConfirmBooking,
    Contact, CreateBooking, CustomerId, DeliveryStatus, LineItem, Money, PartnerId, PickBooking,
    RejectBooking,
};
use event_store::EventStore;
use fulfillment::{
    FulfillmentCoordinator, InMemoryCatalog, InMemoryNotificationLog, InMemoryPartnerDirectory,
    InMemoryPaymentGateway, InMemoryPushSender, PaymentReconciler,
};
use projections::views::{BookingRecord, CustomerBookingSummary};
use projections::{BookingDirectoryView, CustomerBookingsView, ProjectionProcessor};
use serde::{Deserialize, Serialize};

use crate::auth::{Actor, CredentialStore, actor_from_headers};
use crate::error::ApiError;

/// The fulfillment coordinator wired with the default collaborator services.
pub type Coordinator<S> = FulfillmentCoordinator<
    S,
    InMemoryCatalog,
    InMemoryPartnerDirectory,
    InMemoryNotificationLog,
    InMemoryPushSender,
>;

/// The payment reconciler wired with the default collaborator services.
pub type Reconciler<S> = PaymentReconciler<
    S,
    InMemoryPaymentGateway,
    InMemoryCatalog,
    InMemoryPartnerDirectory,
    InMemoryNotificationLog,
    InMemoryPushSender,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub coordinator: Arc<Coordinator<S>>,
    pub reconciler: Reconciler<S>,
    pub notification_log: InMemoryNotificationLog,
    pub booking_directory: BookingDirectoryView,
    pub customer_bookings: CustomerBookingsView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl<S: EventStore> AppState<S> {
    pub(crate) fn actor(&self, headers: &HeaderMap) -> Result<Actor, ApiError> {
        actor_from_headers(self.credentials.as_ref(), headers)
    }

    pub(crate) async fn catch_up(&self) -> Result<(), ApiError> {
        self.projection_processor
            .run_catch_up()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Option<String>,
    pub contact: ContactRequest,
    pub items: Vec<LineItemRequest>,
    pub total_cents: i64,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub status: Option<BookingStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub assigned_to: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub sequence_id: Option<String>,
    pub status: String,
    pub delivery_status: String,
    pub assigned_to: Option<String>,
    pub items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub payment_method: Option<String>,
    pub cancel_reason: Option<String>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct AdminBookingResponse {
    pub id: String,
    pub sequence_id: String,
    pub customer_id: Option<String>,
    pub status: String,
    pub delivery_status: String,
    pub assigned_to: Option<String>,
    pub items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub payment_method: String,
    pub cancel_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub payment: Option<PaymentRefResponse>,
}

#[derive(Serialize)]
pub struct PaymentRefResponse {
    pub payment_record_id: String,
    pub gateway_order_id: String,
    pub amount_cents: i64,
    pub state: String,
}

#[derive(Serialize)]
pub struct CustomerBookingResponse {
    pub id: String,
    pub sequence_id: String,
    pub status: String,
    pub delivery_status: String,
    pub total_cents: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    pub claimed: usize,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

impl BookingResponse {
    pub(crate) fn from_aggregate(booking: &Booking) -> Self {
        Self {
            id: booking.id().map(|id| id.to_string()).unwrap_or_default(),
            sequence_id: booking.sequence_id().map(|s| s.to_string()),
            status: booking.status().as_str().to_string(),
            delivery_status: booking.delivery_status().as_str().to_string(),
            assigned_to: booking.assigned_to().map(|p| p.to_string()),
            items: booking.items().iter().map(LineItemResponse::from).collect(),
            total_cents: booking.total_amount().cents(),
            payment_method: booking.payment_method().map(|m| m.as_str().to_string()),
            cancel_reason: booking.cancel_reason().map(String::from),
        }
    }
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
        }
    }
}

impl From<BookingRecord> for AdminBookingResponse {
    fn from(record: BookingRecord) -> Self {
        let booking = record.booking;
        Self {
            id: booking.booking_id.to_string(),
            sequence_id: booking.sequence_id.to_string(),
            customer_id: booking.customer_id.map(|c| c.to_string()),
            status: booking.status.as_str().to_string(),
            delivery_status: booking.delivery_status.as_str().to_string(),
            assigned_to: booking.assigned_to.map(|p| p.to_string()),
            items: booking.items.iter().map(LineItemResponse::from).collect(),
            total_cents: booking.total_amount.cents(),
            payment_method: booking.payment_method.as_str().to_string(),
            cancel_reason: booking.cancel_reason,
            created_at: booking.created_at.to_rfc3339(),
            updated_at: booking.updated_at.to_rfc3339(),
            payment: record.payment.map(|p| PaymentRefResponse {
                payment_record_id: p.payment_record_id.to_string(),
                gateway_order_id: p.gateway_order_id,
                amount_cents: p.amount.cents(),
                state: p.state.as_str().to_string(),
            }),
        }
    }
}

impl From<CustomerBookingSummary> for CustomerBookingResponse {
    fn from(summary: CustomerBookingSummary) -> Self {
        Self {
            id: summary.booking_id.to_string(),
            sequence_id: summary.sequence_id.to_string(),
            status: summary.status.as_str().to_string(),
            delivery_status: summary.delivery_status.as_str().to_string(),
            total_cents: summary.total_amount.cents(),
            created_at: summary.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /bookings — cash-on-delivery intake, open to guests.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let actor = state.actor(&headers)?;

    let customer_id = match (&req.customer_id, &actor) {
        (Some(id_str), _) => Some(parse_customer_id(id_str)?),
        (None, Actor::Customer { id, .. }) => Some(*id),
        _ => None,
    };

    let cmd = CreateBooking::new(
        customer_id,
        contact_from_request(req.contact),
        req.items.into_iter().map(line_item_from_request).collect(),
        Money::from_cents(req.total_cents),
    );

    let result = state.coordinator.intake_cod(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_aggregate(&result.aggregate)),
    ))
}

/// GET /bookings — admin listing of all bookings with linked payments.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminBookingResponse>>, ApiError> {
    state.actor(&headers)?.require_admin()?;
    state.catch_up().await?;

    let records = state.booking_directory.all_bookings().await;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /bookings/:id — single booking, visible to admin, owner, and the
/// assigned partner.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AdminBookingResponse>, ApiError> {
    let actor = state.actor(&headers)?;
    let booking_id = parse_aggregate_id(&id)?;

    state.catch_up().await?;
    let record = state
        .booking_directory
        .get_booking(booking_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    authorize_read(&actor, &record)?;

    Ok(Json(record.into()))
}

/// PATCH /bookings/:id — admin field override outside the guarded protocol.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    state.actor(&headers)?.require_admin()?;
    let booking_id = parse_aggregate_id(&id)?;

    let mut cmd = AdminUpdateBooking::new(booking_id);
    cmd.status = req.status;
    cmd.delivery_status = req.delivery_status;
    if let Some(partner_str) = req.assigned_to {
        let uuid = uuid::Uuid::parse_str(&partner_str)
            .map_err(|e| ApiError::BadRequest(format!("Invalid partner id: {e}")))?;
        cmd.assigned_to = Some(PartnerId::from_uuid(uuid));
    }

    let result = state.coordinator.bookings().admin_update(cmd).await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// DELETE /bookings/:id — removes the booking from the directory.
///
/// The event log is untouched; a full projection rebuild brings the entry
/// back. Owner or admin only.
#[tracing::instrument(skip(state, headers))]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let actor = state.actor(&headers)?;
    let booking_id = parse_aggregate_id(&id)?;

    state.catch_up().await?;
    let record = state
        .booking_directory
        .get_booking(booking_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    let allowed = match &actor {
        Actor::Admin => true,
        Actor::Customer { id, .. } => record.booking.customer_id == Some(*id),
        _ => false,
    };
    if !allowed {
        return Err(ApiError::Forbidden(
            "only the owner or an admin may delete a booking".to_string(),
        ));
    }

    let deleted = state.booking_directory.remove_booking(booking_id).await;
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /bookings/:id/pick — partner claims the booking; losers get 400.
#[tracing::instrument(skip(state, headers))]
pub async fn pick<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let partner_id = state.actor(&headers)?.require_partner()?;
    let booking_id = parse_aggregate_id(&id)?;

    let result = state
        .coordinator
        .bookings()
        .pick(PickBooking::new(booking_id, partner_id))
        .await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// POST /bookings/:id/confirm — partner or admin confirms.
#[tracing::instrument(skip(state, headers))]
pub async fn confirm<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let actor = state.actor(&headers)?;
    let confirmed_by = match &actor {
        Actor::Admin => None,
        Actor::Partner { id } => Some(*id),
        Actor::Guest => {
            return Err(ApiError::Unauthorized("credentials required".to_string()));
        }
        Actor::Customer { .. } => {
            return Err(ApiError::Forbidden(
                "customers may not confirm bookings".to_string(),
            ));
        }
    };
    let booking_id = parse_aggregate_id(&id)?;

    let result = state
        .coordinator
        .bookings()
        .confirm(ConfirmBooking::new(booking_id, confirmed_by))
        .await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// POST /bookings/:id/complete — partner or admin completes; stock adjusts.
#[tracing::instrument(skip(state, headers))]
pub async fn complete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let actor = state.actor(&headers)?;
    match &actor {
        Actor::Admin | Actor::Partner { .. } => {}
        Actor::Guest => {
            return Err(ApiError::Unauthorized("credentials required".to_string()));
        }
        Actor::Customer { .. } => {
            return Err(ApiError::Forbidden(
                "customers may not complete bookings".to_string(),
            ));
        }
    }
    let booking_id = parse_aggregate_id(&id)?;

    let result = state.coordinator.complete_booking(booking_id).await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// POST /bookings/:id/reject — admin rejects.
#[tracing::instrument(skip(state, headers))]
pub async fn reject<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    state.actor(&headers)?.require_admin()?;
    let booking_id = parse_aggregate_id(&id)?;

    let result = state
        .coordinator
        .bookings()
        .reject(RejectBooking::new(booking_id))
        .await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// POST /bookings/:id/cancel — owner or admin cancels; partners may not.
#[tracing::instrument(skip(state, headers, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let actor = state.actor(&headers)?;
    let booking_id = parse_aggregate_id(&id)?;

    let cancelled_by = match &actor {
        Actor::Admin => Some("admin".to_string()),
        Actor::Customer { id, .. } => {
            let booking = state
                .coordinator
                .bookings()
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;
            if booking.customer_id() != Some(*id) {
                return Err(ApiError::Forbidden(
                    "only the owner may cancel this booking".to_string(),
                ));
            }
            Some(id.to_string())
        }
        Actor::Guest => {
            return Err(ApiError::Unauthorized("credentials required".to_string()));
        }
        Actor::Partner { .. } => {
            return Err(ApiError::Forbidden(
                "partners may not cancel bookings".to_string(),
            ));
        }
    };

    let result = state
        .coordinator
        .bookings()
        .cancel(CancelBooking::new(booking_id, req.reason, cancelled_by))
        .await?;
    Ok(Json(BookingResponse::from_aggregate(&result.aggregate)))
}

/// POST /bookings/claim — attaches the caller's guest bookings by email.
#[tracing::instrument(skip(state, headers))]
pub async fn claim<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<ClaimResponse>, ApiError> {
    let (customer_id, email) = {
        let actor = state.actor(&headers)?;
        let (id, email) = actor.require_customer()?;
        let email = email
            .ok_or_else(|| ApiError::BadRequest("customer email required".to_string()))?
            .to_string();
        (id, email)
    };

    state.catch_up().await?;
    let guest_ids = state
        .customer_bookings
        .guest_booking_ids_for_email(&email)
        .await;

    let mut claimed = 0;
    for booking_id in guest_ids {
        state
            .coordinator
            .bookings()
            .attach_owner(AttachOwner::new(booking_id, customer_id))
            .await?;
        claimed += 1;
    }

    Ok(Json(ClaimResponse { claimed }))
}

/// GET /customers/bookings — the caller's bookings, guest history merged.
#[tracing::instrument(skip(state, headers))]
pub async fn customer_list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CustomerBookingResponse>>, ApiError> {
    let (customer_id, email) = {
        let actor = state.actor(&headers)?;
        let (id, email) = actor.require_customer()?;
        (id, email.unwrap_or_default().to_string())
    };

    state.catch_up().await?;
    let bookings = state
        .customer_bookings
        .bookings_for_customer(customer_id, &email)
        .await;

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// -- Helpers --

fn authorize_read(actor: &Actor, record: &BookingRecord) -> Result<(), ApiError> {
    let allowed = match actor {
        Actor::Admin => true,
        Actor::Customer { id, .. } => record.booking.customer_id == Some(*id),
        Actor::Partner { id } => record.booking.assigned_to == Some(*id),
        Actor::Guest => false,
    };
    if allowed {
        Ok(())
    } else if matches!(actor, Actor::Guest) {
        Err(ApiError::Unauthorized("credentials required".to_string()))
    } else {
        Err(ApiError::Forbidden(
            "not authorized to view this booking".to_string(),
        ))
    }
}

fn contact_from_request(req: ContactRequest) -> Contact {
    let contact = Contact::new(req.name, req.email, req.phone, req.address);
    match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => contact.with_location(lat, lon),
        _ => contact,
    }
}

fn line_item_from_request(req: LineItemRequest) -> LineItem {
    LineItem::new(
        req.product_id,
        req.product_name,
        req.quantity,
        Money::from_cents(req.unit_price_cents),
    )
}

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(AggregateId::from(uuid))
}

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}
