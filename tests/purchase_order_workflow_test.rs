mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn delivering_an_order_receives_stock_per_line() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = app.seed_product("RECV-1", dec!(8), dec!(20), 7, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "expected_delivery_date": "2025-08-01",
                "items": [
                    { "product_id": product.id, "quantity": 5, "purchase_price": "8.00" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    assert_eq!(order["status"], "pending");
    assert!(order["order_number"].as_str().unwrap().starts_with("PO-"));
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let delivered = body_json(response).await;
    assert_eq!(delivered["status"], "delivered");
    assert!(delivered["received_at"].is_string());

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 12);

    let (entries, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
    let entry = &entries[0];
    assert_eq!(entry.r#type, "in");
    assert_eq!(entry.quantity, 5);
    assert_eq!(entry.previous_stock, 7);
    assert_eq!(entry.new_stock, 12);
    assert_eq!(entry.reference_type, "purchase");
    assert_eq!(
        entry.reference_id.map(|id| id.to_string()).as_deref(),
        Some(order_id.as_str())
    );
}

#[tokio::test]
async fn delivering_twice_fails_without_double_applying() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = app.seed_product("ONCE-1", dec!(8), dec!(20), 0, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product.id, "quantity": 4 }]
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let first = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert!(body["message"].as_str().unwrap().contains("delivered"));

    // Stock was incremented exactly once
    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 4);
    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn cancelling_a_pending_order_writes_no_movement() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = app.seed_product("POCAN-1", dec!(8), dec!(20), 3, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product.id, "quantity": 9 }]
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/cancel", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "cancelled");

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 3);
    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);

    // Terminal: delivering a cancelled order is an invalid transition
    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn updates_are_allowed_only_while_pending() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = app.seed_product("POUPD-1", dec!(8), dec!(20), 0, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product.id, "quantity": 2 }]
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    // Pending: update succeeds, including replacing the line items
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{}", order_id),
            Some(json!({
                "notes": "rush order",
                "items": [{ "product_id": product.id, "quantity": 6 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The replaced line item set is what got received
    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 6);

    // Delivered: further updates are rejected
    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{}", order_id),
            Some(json!({ "notes": "too late" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn creation_validates_vendor_and_products() {
    let app = TestApp::new().await;
    let product = app.seed_product("POVAL-1", dec!(8), dec!(20), 0, 5).await;

    // Unknown vendor
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": uuid::Uuid::new_v4(),
                "items": [{ "product_id": product.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Inactive vendor
    let vendor = app.seed_vendor("Closed Down Ltd").await;
    app.state
        .services
        .vendors
        .deactivate(vendor.id)
        .await
        .unwrap();
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown product
    let vendor = app.seed_vendor("Beans & Co").await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": uuid::Uuid::new_v4(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Empty line items
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": []
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
