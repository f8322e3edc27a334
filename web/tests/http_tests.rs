//! End-to-end HTTP tests over the full router with in-memory collaborators.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use courier_core::Actor;
use courier_testing::TestMarketplace;
use courier_testing::fixtures::{self, NEAR, FAR, admin, customer, driver_a, driver_b};
use courier_web::{AppState, CORRELATION_ID_HEADER, USER_ID_HEADER, USER_ROLE_HEADER, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(market: &TestMarketplace) -> Router {
    build_router(AppState::new(market.service.clone()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<Actor>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(USER_ID_HEADER, actor.id.to_string())
            .header(USER_ROLE_HEADER, actor.role.as_str());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, json)
}

fn store_order_body(lat: f64, lng: f64) -> Value {
    json!({
        "store_id": fixtures::STORE_ID,
        "address": "12 Rainbow Street",
        "latitude": lat,
        "longitude": lng,
        "items": [{ "product_id": fixtures::PRODUCT_ID, "quantity": 3 }],
        "delivery_fee": 1,
        "payment_method": "cash_on_delivery",
        "phone": "0790000000"
    })
}

async fn place_order(app: &Router) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/customer/orders",
        Some(customer()),
        Some(store_order_body(NEAR.latitude, NEAR.longitude)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["order"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let market = TestMarketplace::new();
    let app = app(&market);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    market.store.set_offline(true);
    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let market = TestMarketplace::new();
    let (status, body) = send(&app(&market), Method::GET, "/api/customer/orders", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_store_order_is_created() {
    let market = TestMarketplace::new();
    let (status, body) = send(
        &app(&market),
        Method::POST,
        "/api/customer/orders",
        Some(customer()),
        Some(store_order_body(NEAR.latitude, NEAR.longitude)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let order = &body["data"]["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["order_type"], "regular");
    assert_eq!(order["user_id"], fixtures::CUSTOMER_ID);
    assert_eq!(order["items"][0]["type"], "product");
    assert!(body["data"]["distance_km"].as_f64().unwrap() < 17.0);
}

#[tokio::test]
async fn test_out_of_range_store_order_reports_distance() {
    let market = TestMarketplace::new();
    let (status, body) = send(
        &app(&market),
        Method::POST,
        "/api/customer/orders",
        Some(customer()),
        Some(store_order_body(FAR.latitude, FAR.longitude)),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "DISTANCE_EXCEEDED");
    assert!(body["distance"].as_f64().unwrap() > 17.0);
    assert!(market.store.is_empty());
}

#[tokio::test]
async fn test_validation_errors_are_keyed_by_field() {
    let market = TestMarketplace::new();
    let app = app(&market);

    let mut body = store_order_body(NEAR.latitude, NEAR.longitude);
    body["phone"] = Value::Null;
    body["items"][0]["quantity"] = json!(0);
    let (status, response) = send(
        &app,
        Method::POST,
        "/api/customer/orders",
        Some(customer()),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["code"], "VALIDATION_ERROR");
    assert!(response["errors"]["phone"].is_array());
    assert!(response["errors"]["items.0.quantity"].is_array());

    let (status, response) = send(
        &app,
        Method::POST,
        "/api/customer/water-tank-orders",
        Some(customer()),
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["errors"]["body"].is_array());
}

#[tokio::test]
async fn test_second_claim_conflicts() {
    let market = TestMarketplace::new();
    let app = app(&market);
    let id = place_order(&app).await;
    let uri = format!("/api/driver/orders/{id}/accept");

    let (status, body) = send(&app, Method::POST, &uri, Some(driver_a()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["employer_id"], fixtures::DRIVER_A);

    let (status, body) = send(&app, Method::POST, &uri, Some(driver_b()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Order is no longer available");
}

#[tokio::test]
async fn test_role_and_scope_checks() {
    let market = TestMarketplace::new();
    let app = app(&market);
    let id = place_order(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/driver/orders/{id}/accept"),
        Some(customer()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/customer/orders/{id}"),
        Some(Actor::customer(fixtures::OTHER_CUSTOMER_ID)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_driver_walks_order_to_delivery_and_customer_rates() {
    let market = TestMarketplace::new();
    let app = app(&market);
    let id = place_order(&app).await;
    let driver = Some(driver_a());

    send(&app, Method::POST, &format!("/api/driver/orders/{id}/accept"), driver, None).await;

    // Skipping straight to delivered is outside the table.
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/driver/orders/{id}/status"),
        driver,
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    for next in ["preparing", "on_the_way"] {
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/driver/orders/{id}/status"),
            driver,
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/driver/orders/{id}/location"),
        driver,
        Some(json!({ "latitude": 31.96, "longitude": 35.92 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tracking"]["position"]["latitude"], 31.96);

    let (status, body) = send(&app, Method::POST, &format!("/api/driver/orders/{id}/deliver"), driver, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "delivered");
    assert!(body["data"]["delivered_at"].is_string());

    let rate = format!("/api/customer/orders/{id}/rate");
    let (status, body) = send(
        &app,
        Method::POST,
        &rate,
        Some(customer()),
        Some(json!({ "rating": 5, "review": "Fast and friendly" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["rating"], 5);

    let (status, body) = send(&app, Method::POST, &rate, Some(customer()), Some(json!({ "rating": 4 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_RATED");

    let (status, body) = send(&app, Method::GET, "/api/driver/performance", driver, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_deliveries"], 1);
}

#[tokio::test]
async fn test_customer_cancels_and_per_type_routes_scope_orders() {
    let market = TestMarketplace::new();
    let app = app(&market);
    let store_order = place_order(&app).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/customer/water-tank-orders/{store_order}"),
        Some(customer()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/customer/orders/{store_order}/cancel"),
        Some(customer()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["message"], "Order cancelled successfully");

    let (status, body) = send(&app, Method::GET, "/api/customer/water-tank-orders/stats", Some(customer()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_orders"], 0);
}

#[tokio::test]
async fn test_admin_back_office() {
    let market = TestMarketplace::new();
    let app = app(&market);
    let id = place_order(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/admin/orders/{id}/assign"),
        Some(admin()),
        Some(json!({ "driver_id": fixtures::DRIVER_B })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["employer_id"], fixtures::DRIVER_B);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = send(&app, Method::GET, "/api/driver/orders/assigned", Some(driver_b()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/admin/orders?status=pending", Some(admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, &format!("/api/admin/orders/{id}/items"), Some(admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    let item = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/order-items/{item}/special-instructions"),
        Some(admin()),
        Some(json!({ "special_instructions": "Ring twice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["special_instructions"], "Ring twice");

    let (status, body) = send(&app, Method::GET, &format!("/api/admin/order-items/{item}"), Some(admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["special_instructions"], "Ring twice");
    let (status, _) = send(&app, Method::GET, "/api/admin/order-items/9999", Some(admin()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/drivers/{}/status", fixtures::DRIVER_A),
        Some(admin()),
        Some(json!({ "status": "suspended" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_online"], false);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/admin/orders/{id}"), Some(admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/api/admin/orders/{id}"), Some(admin()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let market = TestMarketplace::new();
    let request = Request::builder()
        .uri("/health")
        .header(CORRELATION_ID_HEADER, "6f1c1c0e-8a3e-4c1e-9f57-2b1f8f0b8d11")
        .body(Body::empty())
        .unwrap();

    let response = app(&market).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[CORRELATION_ID_HEADER],
        "6f1c1c0e-8a3e-4c1e-9f57-2b1f8f0b8d11"
    );
}
