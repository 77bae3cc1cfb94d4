mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn create_normalizes_sku_and_fetches_back() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "  widget-1 ",
                "name": "Widget",
                "purchase_price": "8.00",
                "selling_price": "20.00",
                "quantity": 10,
                "unit": "pcs",
                "low_stock_threshold": 5
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["sku"], "WIDGET-1");
    assert_eq!(created["quantity"], 10);
    assert_eq!(created["status"], "active");

    let id = created["id"].as_str().unwrap();
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["sku"], "WIDGET-1");
}

#[tokio::test]
async fn duplicate_sku_is_rejected_case_insensitively() {
    let app = TestApp::new().await;
    app.seed_product("WIDGET-1", dec!(8), dec!(20), 10, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "widget-1",
                "name": "Widget again",
                "purchase_price": "8.00",
                "selling_price": "20.00",
                "quantity": 0,
                "unit": "pcs",
                "low_stock_threshold": 1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("WIDGET-1"));
}

#[tokio::test]
async fn selling_price_below_purchase_price_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "CHEAP-1",
                "name": "Sold at a loss",
                "purchase_price": "20.00",
                "selling_price": "8.00",
                "quantity": 0,
                "unit": "pcs",
                "low_stock_threshold": 1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrecognized_unit_and_zero_threshold_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "UNIT-1",
                "name": "Oddly measured",
                "purchase_price": "1.00",
                "selling_price": "2.00",
                "quantity": 0,
                "unit": "furlong",
                "low_stock_threshold": 1
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "UNIT-2",
                "name": "No threshold",
                "purchase_price": "1.00",
                "selling_price": "2.00",
                "quantity": 0,
                "unit": "pcs",
                "low_stock_threshold": 0
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn product_mutation_requires_admin_role() {
    let app = TestApp::new().await;
    let staff = app.staff_token(&["products:read"]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "STAFF-1",
                "name": "Not allowed",
                "purchase_price": "1.00",
                "selling_price": "2.00",
                "quantity": 0,
                "unit": "pcs",
                "low_stock_threshold": 1
            })),
            Some(&staff),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The same caller can still read
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&staff))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_deactivates_and_activate_restores() {
    let app = TestApp::new().await;
    let product = app.seed_product("SOFT-1", dec!(1), dec!(2), 3, 1).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/products/{}", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "inactive");

    // Still fetchable: soft delete, not removal
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/products/{}/activate", product.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn update_patches_fields_but_not_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("PATCH-1", dec!(5), dec!(9), 7, 2).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({
                "name": "Renamed",
                "selling_price": "11.50"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Renamed");
    let selling: rust_decimal::Decimal =
        body["selling_price"].as_str().unwrap().parse().unwrap();
    assert_eq!(selling, dec!(11.50));
    // Quantity is owned by the ledger and unchanged by updates
    assert_eq!(body["quantity"], 7);
}

#[tokio::test]
async fn list_filters_low_stock_products() {
    let app = TestApp::new().await;
    app.seed_product("FULL-1", dec!(1), dec!(2), 50, 5).await;
    app.seed_product("LOW-1", dec!(1), dec!(2), 3, 5).await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/products?low_stock=true", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["sku"], "LOW-1");
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn manual_stock_patch_goes_through_the_ledger() {
    let app = TestApp::new().await;
    let product = app.seed_product("STOCK-1", dec!(1), dec!(2), 10, 2).await;

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/products/{}/stock", product.id),
            Some(json!({
                "movement_type": "in",
                "quantity": 5,
                "note": "recount"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entry = body_json(response).await;
    assert_eq!(entry["type"], "in");
    assert_eq!(entry["previous_stock"], 10);
    assert_eq!(entry["new_stock"], 15);
    assert_eq!(entry["reference_type"], "manual");

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 15);
}
