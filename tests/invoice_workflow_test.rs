mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn paying_an_invoice_deducts_stock_and_writes_one_movement_per_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("WIDGET-9", dec!(8), dec!(20), 10, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "cash",
                "items": [
                    { "product_id": product.id, "quantity": 3, "selling_price": "20.00" }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice = body_json(response).await;
    assert_eq!(invoice["status"], "pending");
    let total: rust_decimal::Decimal =
        invoice["total_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(60));
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid = body_json(response).await;
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid_at"].is_string());

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 7);

    let (entries, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
    let entry = &entries[0];
    assert_eq!(entry.r#type, "out");
    assert_eq!(entry.quantity, 3);
    assert_eq!(entry.previous_stock, 10);
    assert_eq!(entry.new_stock, 7);
    assert_eq!(entry.reference_type, "sale");
    assert_eq!(
        entry.reference_id.map(|id| id.to_string()).as_deref(),
        Some(invoice_id.as_str())
    );
}

#[tokio::test]
async fn insufficient_stock_aborts_payment_with_no_partial_effects() {
    let app = TestApp::new().await;
    let product = app.seed_product("SHORT-1", dec!(8), dec!(20), 7, 5).await;

    let invoice = app
        .state
        .services
        .invoices
        .create(stockledger_api::services::invoices::CreateInvoice {
            invoice_number: None,
            customer_name: "Acme Retail".into(),
            payment_method: stockledger_api::entities::invoice::PaymentMethod::Cash,
            notes: None,
            items: vec![stockledger_api::services::invoices::InvoiceLineInput {
                product_id: product.id,
                quantity: 10,
                selling_price: None,
            }],
        })
        .await
        .unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("SHORT-1"));
    assert!(message.contains("short by 3"));

    // No partial effects: stock, status and ledger are untouched
    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 7);

    let unchanged = app.state.services.invoices.get(invoice.id).await.unwrap();
    assert_eq!(unchanged.status, "pending");

    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn repeated_products_are_checked_cumulatively() {
    let app = TestApp::new().await;
    let product = app.seed_product("CUMUL-1", dec!(8), dec!(20), 7, 5).await;

    // Two lines of 4 against 7 in stock: each line fits, the sum does not
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "card",
                "items": [
                    { "product_id": product.id, "quantity": 4 },
                    { "product_id": product.id, "quantity": 4 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice = body_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 7);
    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn cancelling_a_pending_invoice_writes_no_movement() {
    let app = TestApp::new().await;
    let product = app.seed_product("CANCEL-1", dec!(8), dec!(20), 10, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "transfer",
                "items": [{ "product_id": product.id, "quantity": 2 }]
            })),
        )
        .await;
    let invoice = body_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/cancel", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "cancelled");

    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);

    // Terminal: paying a cancelled invoice is an invalid transition
    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn paying_twice_fails_without_double_deduction() {
    let app = TestApp::new().await;
    let product = app.seed_product("TWICE-1", dec!(8), dec!(20), 10, 5).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "cash",
                "items": [{ "product_id": product.id, "quantity": 3 }]
            })),
        )
        .await;
    let invoice = body_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let first = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let refreshed = app.state.services.products.get(product.id).await.unwrap();
    assert_eq!(refreshed.quantity, 7);
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
async fn invoice_creation_validates_products() {
    let app = TestApp::new().await;

    // Unknown product
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "cash",
                "items": [{ "product_id": uuid::Uuid::new_v4(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Inactive product
    let product = app.seed_product("GONE-1", dec!(8), dec!(20), 10, 5).await;
    app.state
        .services
        .products
        .deactivate(product.id)
        .await
        .unwrap();

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "cash",
                "items": [{ "product_id": product.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn totals_default_to_catalog_selling_prices() {
    let app = TestApp::new().await;
    let widget = app.seed_product("TOTAL-A", dec!(8), dec!(20), 10, 2).await;
    let gadget = app.seed_product("TOTAL-B", dec!(2), dec!(5), 10, 2).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Acme Retail",
                "payment_method": "cash",
                "items": [
                    { "product_id": widget.id, "quantity": 2 },
                    { "product_id": gadget.id, "quantity": 1 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let invoice = body_json(response).await;
    let total: rust_decimal::Decimal =
        invoice["total_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(45));
}
