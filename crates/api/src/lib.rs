//! HTTP API server with observability for the Retrowoods backend.
//!
//! Provides REST endpoints for booking intake and lifecycle, payment
//! reconciliation, and partner notifications, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use event_store::EventStore;
use fulfillment::{
    FulfillmentCoordinator, InMemoryCatalog, InMemoryNotificationLog, InMemoryPartnerDirectory,
    InMemoryPaymentGateway, InMemoryPushSender, NotificationDispatcher, PaymentReconciler,
    SignatureVerifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{BookingDirectoryView, CustomerBookingsView, Projection, ProjectionProcessor};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::StaticCredentialStore;
use config::Config;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/bookings", get(routes::bookings::list::<S>))
        .route("/bookings/claim", post(routes::bookings::claim::<S>))
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}", patch(routes::bookings::update::<S>))
        .route("/bookings/{id}", delete(routes::bookings::delete::<S>))
        .route("/bookings/{id}/pick", post(routes::bookings::pick::<S>))
        .route(
            "/bookings/{id}/confirm",
            post(routes::bookings::confirm::<S>),
        )
        .route(
            "/bookings/{id}/complete",
            post(routes::bookings::complete::<S>),
        )
        .route("/bookings/{id}/reject", post(routes::bookings::reject::<S>))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel::<S>))
        .route(
            "/customers/bookings",
            get(routes::bookings::customer_list::<S>),
        )
        .route("/payments/order", post(routes::payments::create_order::<S>))
        .route("/payments/verify", post(routes::payments::verify::<S>))
        .route(
            "/partners/notifications",
            get(routes::partners::notifications::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state with in-memory collaborator
/// services. Returns the catalog and partner directory handles so callers
/// can seed products and rosters.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    InMemoryCatalog,
    InMemoryPartnerDirectory,
) {
    use domain::booking::BookingService;
    use domain::sequence::InMemorySequenceAllocator;

    let catalog = InMemoryCatalog::new();
    let partners = InMemoryPartnerDirectory::new();
    let notification_log = InMemoryNotificationLog::new();
    let push = InMemoryPushSender::new();

    let dispatcher = NotificationDispatcher::new(
        Arc::new(partners.clone()),
        Arc::new(notification_log.clone()),
        Arc::new(push),
    );

    let bookings = Arc::new(BookingService::new(
        event_store.clone(),
        Arc::new(InMemorySequenceAllocator::new(
            config.sequence_prefix.clone(),
        )),
        config.cod_initial_status,
    ));
    let coordinator = Arc::new(FulfillmentCoordinator::new(
        bookings,
        Arc::new(catalog.clone()),
        dispatcher,
    ));

    let reconciler = PaymentReconciler::new(
        event_store.clone(),
        Arc::new(InMemoryPaymentGateway::new()),
        SignatureVerifier::new(config.gateway_secret.as_str()),
        Arc::clone(&coordinator),
        config.gateway_name.clone(),
    );

    let booking_directory = BookingDirectoryView::new();
    let customer_bookings = CustomerBookingsView::new();

    let mut processor = ProjectionProcessor::new(event_store);
    processor.register(Box::new(booking_directory.clone()) as Box<dyn Projection>);
    processor.register(Box::new(customer_bookings.clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        coordinator,
        reconciler,
        notification_log,
        booking_directory,
        customer_bookings,
        projection_processor: processor.clone(),
        credentials: Arc::new(StaticCredentialStore::new(config.admin_key.clone())),
    });

    (state, processor, catalog, partners)
}
