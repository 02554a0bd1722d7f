//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::booking::{CodInitialStatus, CustomerId, PartnerId};
use event_store::InMemoryEventStore;
use fulfillment::{Partner, SignatureVerifier};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

const ADMIN_KEY: &str = "test_admin_key";
const GATEWAY_SECRET: &str = "test_gateway_secret";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    partner: PartnerId,
    other_partner: PartnerId,
}

fn setup() -> TestApp {
    setup_with(CodInitialStatus::Confirmed)
}

fn setup_with(cod_initial_status: CodInitialStatus) -> TestApp {
    let config = api::config::Config {
        admin_key: ADMIN_KEY.to_string(),
        gateway_secret: GATEWAY_SECRET.to_string(),
        cod_initial_status,
        ..api::config::Config::default()
    };

    let store = InMemoryEventStore::new();
    let (state, _processor, catalog, partners) = api::create_default_state(store, &config);

    catalog.set_stock("SKU-P", 10);
    catalog.set_stock("SKU-Q", 4);

    let partner = PartnerId::new();
    let other_partner = PartnerId::new();
    partners.add_partner(Partner::new(partner, "Asha").with_push_token("tok-asha"));
    partners.add_partner(Partner::new(other_partner, "Birgit"));

    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        partner,
        other_partner,
    }
}

fn cod_booking_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "contact": {
            "name": "Ada",
            "email": email,
            "phone": "555-0100",
            "address": "1 Main St"
        },
        "items": [{
            "product_id": "SKU-Q",
            "product_name": "Quilt Rack",
            "quantity": 1,
            "unit_price_cents": 900
        }],
        "total_cents": 900
    })
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_cod_booking(app: &axum::Router, email: &str) -> serde_json::Value {
    let (status, json) = send(
        app,
        "POST",
        "/bookings",
        &[],
        Some(cod_booking_body(email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();
    let (status, json) = send(&t.app, "GET", "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cod_intake_as_guest() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;

    assert!(booking["id"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["delivery_status"], "pending");
    assert_eq!(booking["payment_method"], "cod");
    assert_eq!(booking["sequence_id"], "Retrowoods-001");
    assert_eq!(booking["total_cents"], 900);
}

#[tokio::test]
async fn test_sequence_ids_increment() {
    let t = setup();
    let first = create_cod_booking(&t.app, "ada@example.com").await;
    let second = create_cod_booking(&t.app, "ada@example.com").await;
    assert_eq!(first["sequence_id"], "Retrowoods-001");
    assert_eq!(second["sequence_id"], "Retrowoods-002");
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let t = setup();
    let mut body = cod_booking_body("ada@example.com");
    body["items"][0]["product_id"] = serde_json::json!("SKU-GHOST");

    let (status, json) = send(&t.app, "POST", "/bookings", &[], Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("SKU-GHOST"));
}

#[tokio::test]
async fn test_admin_list_requires_key() {
    let t = setup();
    create_cod_booking(&t.app, "ada@example.com").await;

    let (status, _) = send(&t.app, "GET", "/bookings", &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, "GET", "/bookings", &[("x-admin-key", "wrong")], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(
        &t.app,
        "GET",
        "/bookings",
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert!(json[0]["payment"].is_null());
}

#[tokio::test]
async fn test_get_booking_not_found() {
    let t = setup();
    let missing = common::AggregateId::new();
    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/bookings/{missing}"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transition_on_unknown_booking_not_found() {
    let t = setup();
    let missing = common::AggregateId::new();
    let partner = t.partner.to_string();

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/bookings/{missing}/pick"),
        &[("x-partner-id", partner.as_str())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/bookings/{missing}/cancel"),
        &[("x-admin-key", ADMIN_KEY)],
        Some(serde_json::json!({ "reason": "mistyped id" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pick_race_one_winner() {
    let t = setup_with(CodInitialStatus::Pending);
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    assert_eq!(booking["status"], "pending");
    let id = booking["id"].as_str().unwrap();

    let partner = t.partner.to_string();
    let (status, picked) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/pick"),
        &[("x-partner-id", partner.as_str())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picked["status"], "picked");
    assert_eq!(picked["delivery_status"], "out_for_delivery");
    assert_eq!(picked["assigned_to"], partner.as_str());

    let other = t.other_partner.to_string();
    let (status, json) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/pick"),
        &[("x-partner-id", other.as_str())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("claimed"));
}

#[tokio::test]
async fn test_pick_requires_partner() {
    let t = setup_with(CodInitialStatus::Pending);
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();

    let (status, _) = send(&t.app, "POST", &format!("/bookings/{id}/pick"), &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/pick"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_complete_adjusts_nothing_visible_but_succeeds() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();

    let (status, completed) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/complete"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["delivery_status"], "delivered");
}

#[tokio::test]
async fn test_cancel_authorization() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();
    let reason = serde_json::json!({ "reason": "changed my mind" });

    let partner = t.partner.to_string();
    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/cancel"),
        &[("x-partner-id", partner.as_str())],
        Some(reason.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/cancel"),
        &[("x-admin-key", ADMIN_KEY)],
        Some(reason),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancel_reason"], "changed my mind");
}

#[tokio::test]
async fn test_cancel_completed_booking_fails() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/complete"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &t.app,
        "POST",
        &format!("/bookings/{id}/cancel"),
        &[("x-admin-key", ADMIN_KEY)],
        Some(serde_json::json!({ "reason": "too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("completed"));
}

#[tokio::test]
async fn test_admin_update_overrides_state() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();

    let (status, updated) = send(
        &t.app,
        "PATCH",
        &format!("/bookings/{id}"),
        &[("x-admin-key", ADMIN_KEY)],
        Some(serde_json::json!({ "delivery_status": "shipping" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["delivery_status"], "shipping");
}

#[tokio::test]
async fn test_online_payment_flow() {
    let t = setup();

    let (status, order) = send(
        &t.app,
        "POST",
        "/payments/order",
        &[],
        Some(serde_json::json!({
            "contact": {
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "address": "1 Main St"
            },
            "items": [{
                "product_id": "SKU-P",
                "product_name": "Pine Shelf",
                "quantity": 2,
                "unit_price_cents": 1500
            }],
            "total_cents": 3000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["amount_cents"], 3000);
    assert_eq!(order["currency"], "INR");

    let gateway_order_id = order["gateway_order_id"].as_str().unwrap();
    let signature =
        SignatureVerifier::new(GATEWAY_SECRET).expected(gateway_order_id, "pay_001");

    let (status, verified) = send(
        &t.app,
        "POST",
        "/payments/verify",
        &[],
        Some(serde_json::json!({
            "payment_record_id": order["payment_record_id"],
            "gateway_order_id": gateway_order_id,
            "gateway_payment_id": "pay_001",
            "signature": signature
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["success"], true);
    assert_eq!(verified["booking"]["status"], "confirmed");
    assert_eq!(verified["booking"]["payment_method"], "razorpay");
    assert_eq!(verified["booking"]["total_cents"], 3000);

    // The admin listing joins the settled payment onto the booking.
    let (status, listed) = send(
        &t.app,
        "GET",
        "/bookings",
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["payment"]["state"], "paid");
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let t = setup();

    let (_, order) = send(
        &t.app,
        "POST",
        "/payments/order",
        &[],
        Some(serde_json::json!({
            "contact": {
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "address": "1 Main St"
            },
            "items": [{
                "product_id": "SKU-P",
                "product_name": "Pine Shelf",
                "quantity": 1,
                "unit_price_cents": 1500
            }],
            "total_cents": 1500
        })),
    )
    .await;

    let (status, verified) = send(
        &t.app,
        "POST",
        "/payments/verify",
        &[],
        Some(serde_json::json!({
            "payment_record_id": order["payment_record_id"],
            "gateway_order_id": order["gateway_order_id"],
            "gateway_payment_id": "pay_bad",
            "signature": "deadbeef"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(verified["success"], false);

    // No booking materialized from the failed callback.
    let (_, listed) = send(
        &t.app,
        "GET",
        "/bookings",
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_claim_and_customer_listing() {
    let t = setup();
    create_cod_booking(&t.app, "ada@example.com").await;
    create_cod_booking(&t.app, "birgit@example.com").await;

    let customer = CustomerId::new().to_string();
    let headers = [
        ("x-customer-id", customer.as_str()),
        ("x-customer-email", "ada@example.com"),
    ];

    let (status, claimed) = send(&t.app, "POST", "/bookings/claim", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["claimed"], 1);

    let (status, bookings) = send(&t.app, "GET", "/customers/bookings", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bookings.as_array().unwrap().len(), 1);
    assert_eq!(bookings[0]["sequence_id"], "Retrowoods-001");

    // Claiming again finds nothing left.
    let (_, claimed) = send(&t.app, "POST", "/bookings/claim", &headers, None).await;
    assert_eq!(claimed["claimed"], 0);
}

#[tokio::test]
async fn test_partner_notifications_newest_first() {
    let t = setup();
    create_cod_booking(&t.app, "ada@example.com").await;
    create_cod_booking(&t.app, "ada@example.com").await;

    let partner = t.partner.to_string();
    let (status, notifications) = send(
        &t.app,
        "GET",
        "/partners/notifications",
        &[("x-partner-id", partner.as_str())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = notifications.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["sequence_id"], "Retrowoods-002");
    assert_eq!(list[1]["sequence_id"], "Retrowoods-001");
}

#[tokio::test]
async fn test_delete_booking_requires_owner_or_admin() {
    let t = setup();
    let booking = create_cod_booking(&t.app, "ada@example.com").await;
    let id = booking["id"].as_str().unwrap();

    let partner = t.partner.to_string();
    let (status, _) = send(
        &t.app,
        "DELETE",
        &format!("/bookings/{id}"),
        &[("x-partner-id", partner.as_str())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, deleted) = send(
        &t.app,
        "DELETE",
        &format!("/bookings/{id}"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);

    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/bookings/{id}"),
        &[("x-admin-key", ADMIN_KEY)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
