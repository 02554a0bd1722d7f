//! Payment reconciliation protocol.
//!
//! Two phases. `create_order` opens a gateway intent and persists a payment
//! record carrying a snapshot of the prospective booking. `verify` handles
//! the gateway callback: it checks the keyed-hash signature and settles the
//! record exactly once, materializing the booking on success.
//!
//! Settlement rides on a compare-and-set append against the payment record,
//! so duplicate or concurrent callbacks collapse to one settlement; the
//! losers re-read the record and report the recorded outcome.

use std::sync::Arc;
use std::time::Duration;

use common::AggregateId;
use domain::aggregate::{Aggregate, DomainEvent};
use domain::booking::{Contact, CreateBooking, CustomerId, LineItem, Money};
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreError, Version};

use crate::coordinator::FulfillmentCoordinator;
use crate::dispatcher::NotificationLog;
use crate::error::{FulfillmentError, Result};
use crate::payment::{BookingSnapshot, Payment, PaymentEvent, PaymentState};
use crate::services::{
    CatalogDirectory, PartnerDirectory, PaymentGateway, PushSender, StockLedger,
};
use crate::signature::SignatureVerifier;

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CURRENCY: &str = "INR";

/// Request to open a gateway payment intent for a prospective booking.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// The owning customer, if placed by a registered account.
    pub customer_id: Option<CustomerId>,

    /// Delivery contact.
    pub contact: Contact,

    /// Line items ordered.
    pub items: Vec<LineItem>,

    /// Total amount in minor units.
    pub total_amount: Money,
}

/// A gateway order handed back to the client for checkout.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    /// Our payment record's id; the callback must reference it.
    pub payment_record_id: AggregateId,

    /// The order id the gateway assigned.
    pub gateway_order_id: String,

    /// Amount the intent was opened for.
    pub amount: Money,

    /// ISO currency code.
    pub currency: String,
}

/// The gateway callback payload presented for verification.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    /// The gateway's order id, signed together with the payment id.
    pub gateway_order_id: String,

    /// The gateway's payment id.
    pub gateway_payment_id: String,

    /// Hex HMAC-SHA256 over `"{order_id}|{payment_id}"`.
    pub signature: String,
}

/// Outcome of a verification callback.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Whether the payment is verified as paid.
    pub verified: bool,

    /// The booking created for the payment, when verified.
    pub booking_id: Option<AggregateId>,
}

/// Drives the two-phase payment reconciliation protocol.
pub struct PaymentReconciler<S, G, C, P, L, Push>
where
    S: EventStore,
{
    store: S,
    gateway: Arc<G>,
    verifier: SignatureVerifier,
    coordinator: Arc<FulfillmentCoordinator<S, C, P, L, Push>>,
    gateway_name: String,
    currency: String,
    gateway_timeout: Duration,
}

impl<S, G, C, P, L, Push> PaymentReconciler<S, G, C, P, L, Push>
where
    S: EventStore,
    G: PaymentGateway,
    C: CatalogDirectory + StockLedger,
    P: PartnerDirectory,
    L: NotificationLog,
    Push: PushSender,
{
    /// Creates a reconciler. `store` must be the same store the booking
    /// service writes to.
    pub fn new(
        store: S,
        gateway: Arc<G>,
        verifier: SignatureVerifier,
        coordinator: Arc<FulfillmentCoordinator<S, C, P, L, Push>>,
        gateway_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            verifier,
            coordinator,
            gateway_name: gateway_name.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the currency intents are opened in.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Overrides how long a gateway call may take before being abandoned.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Opens a gateway intent for a prospective booking.
    ///
    /// The booking itself is not created yet; a payment record is persisted
    /// carrying everything needed to create it once the callback verifies.
    /// Nothing is persisted if validation or the gateway call fails.
    #[tracing::instrument(skip(self, intent))]
    pub async fn create_order(&self, intent: PaymentIntent) -> Result<GatewayOrder> {
        self.validate_intent(&intent).await?;

        let gateway_intent = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_intent(intent.total_amount, &self.currency),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                metrics::counter!("gateway_timeouts_total").increment(1);
                return Err(FulfillmentError::Gateway(
                    "gateway intent creation timed out".to_string(),
                ));
            }
        };

        let payment_record_id = AggregateId::new();
        let snapshot = BookingSnapshot {
            customer_id: intent.customer_id,
            contact: intent.contact,
            items: intent.items,
            total_amount: intent.total_amount,
        };

        let payment = Payment::default();
        let events = payment.initiate(
            payment_record_id,
            gateway_intent.gateway_order_id.clone(),
            intent.total_amount,
            self.currency.clone(),
            snapshot,
        )?;
        self.append_payment_events(payment_record_id, Version::initial(), events)
            .await?;

        metrics::counter!("payment_intents_total").increment(1);
        tracing::info!(
            payment_record_id = %payment_record_id,
            gateway_order_id = %gateway_intent.gateway_order_id,
            "Payment intent opened"
        );

        Ok(GatewayOrder {
            payment_record_id,
            gateway_order_id: gateway_intent.gateway_order_id,
            amount: intent.total_amount,
            currency: self.currency.clone(),
        })
    }

    /// Verifies a gateway callback and settles the payment record.
    ///
    /// Idempotent: a record that already settled reports its recorded
    /// outcome without re-verifying anything.
    #[tracing::instrument(skip(self, request), fields(gateway_order_id = %request.gateway_order_id))]
    pub async fn verify(
        &self,
        payment_record_id: AggregateId,
        request: VerificationRequest,
    ) -> Result<VerificationOutcome> {
        let payment = self
            .load_payment(payment_record_id)
            .await?
            .ok_or(FulfillmentError::PaymentNotFound(payment_record_id))?;

        if payment.gateway_order_id() != Some(request.gateway_order_id.as_str()) {
            return Err(FulfillmentError::PaymentNotFound(payment_record_id));
        }

        match payment.state() {
            PaymentState::Paid => Ok(VerificationOutcome {
                verified: true,
                booking_id: payment.booking_id(),
            }),
            PaymentState::Failed => Ok(VerificationOutcome {
                verified: false,
                booking_id: None,
            }),
            PaymentState::Errored => Err(FulfillmentError::Gateway(format!(
                "payment errored: {}",
                payment.error_reason().unwrap_or("unknown")
            ))),
            PaymentState::Created => self.settle(payment_record_id, payment, request).await,
        }
    }

    /// Loads a payment record, or None if it doesn't exist.
    pub async fn get_payment(&self, payment_record_id: AggregateId) -> Result<Option<Payment>> {
        self.load_payment(payment_record_id).await
    }

    async fn settle(
        &self,
        payment_record_id: AggregateId,
        payment: Payment,
        request: VerificationRequest,
    ) -> Result<VerificationOutcome> {
        if !self.verifier.verify(
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.signature,
        ) {
            tracing::warn!(payment_record_id = %payment_record_id, "Signature mismatch");
            let events = payment.mark_failed(
                Some(request.gateway_payment_id),
                Some(request.signature),
            )?;
            return match self
                .append_payment_events(payment_record_id, payment.version(), events)
                .await
            {
                Ok(_) => {
                    metrics::counter!("payment_failures_total").increment(1);
                    Ok(VerificationOutcome {
                        verified: false,
                        booking_id: None,
                    })
                }
                Err(FulfillmentError::EventStore(EventStoreError::ConcurrencyConflict {
                    ..
                })) => self.recorded_outcome(payment_record_id).await,
                Err(error) => Err(error),
            };
        }

        // The booking id is chosen before the CAS so the settlement event
        // already carries it; the loser of a concurrent race never creates
        // an orphan booking because its append fails first.
        let booking_id = AggregateId::new();
        let events = payment.mark_paid(
            request.gateway_payment_id,
            request.signature,
            booking_id,
        )?;
        match self
            .append_payment_events(payment_record_id, payment.version(), events)
            .await
        {
            Ok(_) => {}
            Err(FulfillmentError::EventStore(EventStoreError::ConcurrencyConflict { .. })) => {
                return self.recorded_outcome(payment_record_id).await;
            }
            Err(error) => return Err(error),
        }

        let snapshot = payment.snapshot().ok_or_else(|| {
            FulfillmentError::Gateway("payment record has no booking snapshot".to_string())
        })?;
        let cmd = CreateBooking::new(
            snapshot.customer_id,
            snapshot.contact.clone(),
            snapshot.items.clone(),
            snapshot.total_amount,
        )
        .with_booking_id(booking_id);

        match self
            .coordinator
            .bookings()
            .create_paid(cmd, self.gateway_name.clone())
            .await
        {
            Ok(result) => {
                metrics::counter!("payments_verified_total").increment(1);
                tracing::info!(
                    payment_record_id = %payment_record_id,
                    booking_id = %booking_id,
                    "Payment verified, booking created"
                );
                self.coordinator.notify_paid(&result.aggregate).await;
                Ok(VerificationOutcome {
                    verified: true,
                    booking_id: Some(booking_id),
                })
            }
            Err(error) => {
                tracing::error!(
                    payment_record_id = %payment_record_id,
                    %error,
                    "Booking creation failed for verified payment"
                );
                self.record_error(payment_record_id, &error.to_string()).await;
                Err(FulfillmentError::Gateway(format!(
                    "booking creation failed for verified payment: {error}"
                )))
            }
        }
    }

    /// Re-reads a record after losing a settlement race and reports what the
    /// winner recorded.
    async fn recorded_outcome(
        &self,
        payment_record_id: AggregateId,
    ) -> Result<VerificationOutcome> {
        let payment = self
            .load_payment(payment_record_id)
            .await?
            .ok_or(FulfillmentError::PaymentNotFound(payment_record_id))?;

        match payment.state() {
            PaymentState::Paid => Ok(VerificationOutcome {
                verified: true,
                booking_id: payment.booking_id(),
            }),
            PaymentState::Failed => Ok(VerificationOutcome {
                verified: false,
                booking_id: None,
            }),
            PaymentState::Errored => Err(FulfillmentError::Gateway(format!(
                "payment errored: {}",
                payment.error_reason().unwrap_or("unknown")
            ))),
            PaymentState::Created => Err(FulfillmentError::Gateway(
                "payment settlement conflicted but record is still pending".to_string(),
            )),
        }
    }

    async fn record_error(&self, payment_record_id: AggregateId, reason: &str) {
        let result = async {
            let payment = self
                .load_payment(payment_record_id)
                .await?
                .ok_or(FulfillmentError::PaymentNotFound(payment_record_id))?;
            let events = payment.mark_errored(reason)?;
            self.append_payment_events(payment_record_id, payment.version(), events)
                .await
        }
        .await;

        if let Err(error) = result {
            tracing::error!(payment_record_id = %payment_record_id, %error, "Failed to record payment error");
        }
    }

    async fn validate_intent(&self, intent: &PaymentIntent) -> Result<()> {
        use domain::booking::BookingError;

        if intent.items.is_empty() {
            return Err(domain::DomainError::Booking(BookingError::NoItems).into());
        }
        for item in &intent.items {
            if item.quantity == 0 {
                return Err(domain::DomainError::Booking(BookingError::InvalidQuantity {
                    quantity: item.quantity,
                })
                .into());
            }
        }
        if !intent.total_amount.is_positive() {
            return Err(domain::DomainError::Booking(BookingError::InvalidTotal {
                cents: intent.total_amount.cents(),
            })
            .into());
        }
        intent
            .contact
            .validate()
            .map_err(domain::DomainError::Booking)?;

        self.coordinator.validate_items(&intent.items).await
    }

    async fn load_payment(&self, payment_record_id: AggregateId) -> Result<Option<Payment>> {
        let envelopes = self
            .store
            .get_events_for_aggregate(payment_record_id)
            .await?;
        if envelopes.is_empty() {
            return Ok(None);
        }

        let mut payment = Payment::default();
        let last_version = envelopes
            .last()
            .map(|e| e.version)
            .unwrap_or_else(Version::initial);
        for envelope in envelopes {
            let event: PaymentEvent = serde_json::from_value(envelope.payload)?;
            payment.apply(event);
        }
        payment.set_version(last_version);

        Ok(Some(payment))
    }

    async fn append_payment_events(
        &self,
        payment_record_id: AggregateId,
        current_version: Version,
        events: Vec<PaymentEvent>,
    ) -> Result<Version> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;
        for event in &events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .event_type(event.event_type())
                .aggregate_id(payment_record_id)
                .aggregate_type(Payment::aggregate_type())
                .version(version)
                .payload(event)?
                .build();
            envelopes.push(envelope);
        }

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        Ok(self.store.append(envelopes, options).await?)
    }
}
