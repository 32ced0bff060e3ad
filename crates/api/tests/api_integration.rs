//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::CartConfig;
use domain::InMemoryCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use persistence::InMemoryDatabase;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

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

fn setup() -> axum::Router {
    let state = api::create_state(
        InMemoryDatabase::new(),
        InMemoryCatalog::new(),
        CartConfig::default(),
    );
    api::create_app(state, get_metrics_handle())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn store(id: Uuid, store_type: &str) -> Value {
    json!({
        "id": id,
        "name": "Test store",
        "store_type": store_type,
        "kyc_status": "verified",
        "subscription_active": true,
        "address": {
            "line1": "1 Main St",
            "city": "Austin",
            "state": "TX",
            "postal_code": "78701"
        }
    })
}

struct Seeded {
    buyer: Uuid,
    vendor: Uuid,
    product: Uuid,
}

/// Seeds one buyer, one vendor and one product with `stock` units through the admin routes.
async fn seed(app: &axum::Router, price_cents: i64, stock: u32) -> Seeded {
    let seeded = Seeded {
        buyer: Uuid::new_v4(),
        vendor: Uuid::new_v4(),
        product: Uuid::new_v4(),
    };

    let (status, _) = send(app, "POST", "/admin/stores", Some(store(seeded.buyer, "buyer"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(app, "POST", "/admin/stores", Some(store(seeded.vendor, "vendor"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let product = json!({
        "id": seeded.product,
        "vendor_id": seeded.vendor,
        "name": "Case of sparkling water",
        "base_price": price_cents,
        "moq": 1,
        "max_qty": null,
        "is_active": true,
        "available_qty": stock,
        "volume_tiers": []
    });
    let (status, _) = send(app, "POST", "/admin/products", Some(product)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let inventory = json!({
        "product_id": seeded.product,
        "available_qty": stock,
        "reserved_qty": 0
    });
    let (status, _) = send(app, "PUT", "/admin/inventory", Some(inventory)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    seeded
}

fn quote_body(seeded: &Seeded, quantity: u32) -> Value {
    json!({
        "buyer_store_id": seeded.buyer,
        "items": [{
            "product_id": seeded.product,
            "vendor_store_id": seeded.vendor,
            "quantity": quantity
        }]
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "ok");
}

#[tokio::test]
async fn test_quote_creates_active_cart() {
    let app = setup();
    let seeded = seed(&app, 1250, 10).await;

    let (status, cart) = send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["status"], "active");
    assert_eq!(cart["total"], 5000);
    assert_eq!(cart["vendor_groups"][0]["vendor_id"], json!(seeded.vendor));

    let uri = format!("/carts/active/{}", seeded.buyer);
    let (status, active) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], cart["id"]);
}

#[tokio::test]
async fn test_checkout_flow_writes_orders_and_outbox() {
    let app = setup();
    let seeded = seed(&app, 800, 10).await;

    let (_, cart) = send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 3))).await;

    let checkout = json!({
        "buyer_store_id": seeded.buyer,
        "cart_id": cart["id"],
        "note": "leave at loading dock"
    });
    let (status, group) = send(&app, "POST", "/checkout", Some(checkout)).await;
    assert_eq!(status, StatusCode::CREATED);

    let order = &group["vendor_orders"][0];
    assert_eq!(order["vendor_id"], json!(seeded.vendor));
    assert_eq!(order["subtotal"], 2400);
    assert_eq!(order["line_items"][0]["status"], "pending");
    assert_eq!(order["payment_intent"]["amount"], 2400);

    let group_id = group["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/checkout/{group_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], group["id"]);

    let (status, events) = send(&app, "GET", &format!("/outbox/{group_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "OrderCreated");

    let (status, recent) = send(&app, "GET", "/outbox?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent.as_array().unwrap().len(), 1);

    // The cart is converted, so there is no active cart left.
    let uri = format!("/carts/active/{}", seeded.buyer);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_strict_checkout_shortfall_returns_conflict() {
    let app = setup();
    let seeded = seed(&app, 500, 2).await;

    let (_, cart) = send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 2))).await;

    // Drain stock after quoting so the reservation falls short.
    let inventory = json!({
        "product_id": seeded.product,
        "available_qty": 1,
        "reserved_qty": 0
    });
    send(&app, "PUT", "/admin/inventory", Some(inventory)).await;

    let checkout = json!({
        "buyer_store_id": seeded.buyer,
        "cart_id": cart["id"],
        "fail_on_shortfall": true
    });
    let (status, body) = send(&app, "POST", "/checkout", Some(checkout)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["violations"][0]["code"], "insufficient_inventory");

    let (_, recent) = send(&app, "GET", "/outbox", None).await;
    assert!(recent.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_by_other_buyer_is_forbidden() {
    let app = setup();
    let seeded = seed(&app, 500, 5).await;
    let (_, cart) = send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 1))).await;

    let checkout = json!({
        "buyer_store_id": Uuid::new_v4(),
        "cart_id": cart["id"]
    });
    let (status, _) = send(&app, "POST", "/checkout", Some(checkout)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_quote_error_mapping() {
    let app = setup();
    let seeded = seed(&app, 500, 5).await;

    let (status, body) = send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let unknown = Seeded {
        buyer: Uuid::new_v4(),
        ..seeded
    };
    let (status, _) = send(&app, "POST", "/carts/quote", Some(quote_body(&unknown, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let vendor_as_buyer = Seeded {
        buyer: unknown.vendor,
        ..unknown
    };
    let (status, _) =
        send(&app, "POST", "/carts/quote", Some(quote_body(&vendor_as_buyer, 1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_ids_return_bad_request() {
    let app = setup();

    for uri in [
        "/carts/active/not-a-uuid",
        "/checkout/not-a-uuid",
        "/outbox/not-a-uuid",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().starts_with("Invalid"));
    }
}

#[tokio::test]
async fn test_unknown_checkout_group_returns_not_found() {
    let app = setup();

    let uri = format!("/checkout/{}", Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let seeded = seed(&app, 500, 5).await;
    send(&app, "POST", "/carts/quote", Some(quote_body(&seeded, 1))).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cart_quotes_total"));
}
