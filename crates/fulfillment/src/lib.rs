//! Fulfillment layer for the Retrowoods order backend.
//!
//! This crate orchestrates everything above the booking state machine:
//! - Payment reconciliation: gateway order creation, keyed-hash callback
//!   verification, and booking materialization from a verified payment
//! - Partner notification fan-out with bounded concurrency
//! - Stock ledger decrements on booking completion
//! - Collaborator traits (catalog, partners, push, gateway) with in-memory
//!   implementations for tests and the default server wiring

pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod payment;
pub mod reconciliation;
pub mod services;
pub mod signature;

pub use coordinator::FulfillmentCoordinator;
pub use dispatcher::{
    InMemoryNotificationLog, Notification, NotificationDispatcher, NotificationKind,
    NotificationLog,
};
pub use error::{FulfillmentError, Result};
pub use payment::{BookingSnapshot, Payment, PaymentError, PaymentEvent, PaymentState};
pub use reconciliation::{
    GatewayOrder, PaymentIntent, PaymentReconciler, VerificationOutcome, VerificationRequest,
};
pub use services::{
    CatalogDirectory, GatewayIntent, InMemoryCatalog, InMemoryPartnerDirectory,
    InMemoryPaymentGateway, InMemoryPushSender, Partner, PartnerDirectory, PaymentGateway,
    PushSender, StockLedger,
};
pub use signature::SignatureVerifier;
