mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use stockledger_api::services::dashboard::DashboardService;

/// Seeds the spec's worked scenario: one product (purchase 8, selling 20,
/// quantity 10) and one paid invoice for 3 units at 20.
async fn seed_sale(app: &TestApp) -> uuid::Uuid {
    let product = app.seed_product("SCEN-1", dec!(8), dec!(20), 10, 5).await;

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
    let invoice = body_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/invoices/{}/pay", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    product.id
}

#[tokio::test]
async fn profit_loss_reports_revenue_cost_and_profit() {
    let app = TestApp::new().await;
    seed_sale(&app).await;

    let report = app.state.services.dashboard.profit_loss().await.unwrap();
    assert_eq!(report.revenue, dec!(60.00));
    assert_eq!(report.cost, dec!(24));
    assert_eq!(report.profit, dec!(36.00));
}

#[tokio::test]
async fn overview_counts_and_values() {
    let app = TestApp::new().await;
    let sold = seed_sale(&app).await;

    // A second product sitting at its threshold counts as low stock
    app.seed_product("LOW-9", dec!(2), dec!(4), 5, 5).await;

    let stats = app.state.services.dashboard.overview().await.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.active_products, 2);
    // 7 left of the sold product + 5 of the low one
    assert_eq!(stats.total_stock, 12);
    assert_eq!(stats.low_stock_products, 1);
    // 7 x 8 + 5 x 2
    assert_eq!(stats.inventory_value, dec!(66));
    assert_eq!(stats.total_sales, dec!(60.00));
    assert_eq!(stats.total_cost, dec!(24));
    assert_eq!(stats.total_profit, dec!(36.00));
    assert!(!stats.cached);

    // Deactivating a product changes the active count but not the catalog size
    app.state.services.products.deactivate(sold).await.unwrap();
    let stats = app.state.services.dashboard.overview().await.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.active_products, 1);
}

#[tokio::test]
async fn stock_report_partitions_ledger_totals() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = seed_sale(&app).await; // one out-movement of 3

    // One delivered purchase order adds an in-movement of 5
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product, "quantity": 5, "purchase_price": "8.00" }]
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let response = app
        .request_authenticated(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/deliver", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let start = Utc::now() - Duration::days(1);
    let end = Utc::now() + Duration::days(1);
    let report = app
        .state
        .services
        .dashboard
        .stock_report(start, end)
        .await
        .unwrap();

    assert_eq!(report.total_in, 5);
    assert_eq!(report.total_out, 3);
    assert_eq!(report.net_change, 2);
    assert_eq!(report.entries, 2);

    // A window covering nothing reports zeros, not an error
    let empty = app
        .state
        .services
        .dashboard
        .stock_report(start - Duration::days(30), start - Duration::days(29))
        .await
        .unwrap();
    assert_eq!(empty.total_in, 0);
    assert_eq!(empty.total_out, 0);
    assert_eq!(empty.entries, 0);
}

#[tokio::test]
async fn top_insights_pick_best_product_vendor_and_customer() {
    let app = TestApp::new().await;
    let vendor = app.seed_vendor("Beans & Co").await;
    let product = seed_sale(&app).await;

    // Second customer buys less
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "customer_name": "Corner Shop",
                "payment_method": "card",
                "items": [{ "product_id": product, "quantity": 1 }]
            })),
        )
        .await;
    let invoice = body_json(response).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    app.request_authenticated(
        Method::POST,
        &format!("/api/v1/invoices/{}/pay", invoice_id),
        None,
    )
    .await;

    // Delivered PO establishes the top vendor
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "vendor_id": vendor.id,
                "items": [{ "product_id": product, "quantity": 10, "purchase_price": "8.00" }]
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    app.request_authenticated(
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/deliver", order_id),
        None,
    )
    .await;

    let insights = app.state.services.dashboard.top_insights().await.unwrap();

    let best = insights.best_selling_product.unwrap();
    assert_eq!(best.sku, "SCEN-1");
    assert_eq!(best.quantity_sold, 4);

    let top_vendor = insights.top_vendor.unwrap();
    assert_eq!(top_vendor.name, "Beans & Co");
    assert_eq!(top_vendor.purchase_value, dec!(80.00));
    assert_eq!(top_vendor.orders, 1);

    let top_customer = insights.top_customer.unwrap();
    assert_eq!(top_customer.customer_name, "Acme Retail");
    assert_eq!(top_customer.total_spent, dec!(60.00));
    assert_eq!(top_customer.invoices, 1);
}

#[tokio::test]
async fn top_insights_are_empty_on_a_fresh_system() {
    let app = TestApp::new().await;

    let insights = app.state.services.dashboard.top_insights().await.unwrap();
    assert!(insights.best_selling_product.is_none());
    assert!(insights.top_vendor.is_none());
    assert!(insights.top_customer.is_none());
}

#[tokio::test]
async fn rebuild_is_idempotent_and_side_effect_free_on_the_ledger() {
    let app = TestApp::new().await;
    let product = seed_sale(&app).await;

    let first = app.state.services.dashboard.rebuild().await.unwrap();
    let second = app.state.services.dashboard.rebuild().await.unwrap();

    assert_eq!(first.total_sales, second.total_sales);
    assert_eq!(first.total_profit, second.total_profit);
    assert_eq!(first.total_stock, second.total_stock);

    // The ledger is untouched by rebuilds
    let (_, total) = app
        .state
        .services
        .stock_movements
        .list_for_product(product, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn overview_serves_fresh_snapshot_when_cache_enabled() {
    let app = TestApp::new().await;
    seed_sale(&app).await;

    // A dashboard view with caching enabled over the same database
    let cached_dashboard = DashboardService::new(
        app.state.db.clone(),
        app.state.event_sender.clone(),
        3600,
    );

    cached_dashboard.rebuild().await.unwrap();
    let stats = cached_dashboard.overview().await.unwrap();
    assert!(stats.cached);
    assert_eq!(stats.total_sales, dec!(60.00));

    // The default (TTL 0) path always computes live
    let live = app.state.services.dashboard.overview().await.unwrap();
    assert!(!live.cached);
}

#[tokio::test]
async fn financial_reports_are_admin_only() {
    let app = TestApp::new().await;
    let staff = app.staff_token(&["dashboard:read"]);

    let response = app
        .request(Method::GET, "/api/v1/dashboard/overview", None, Some(&staff))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/profit-loss",
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/api/v1/dashboard/rebuild",
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin passes both
    let response = app
        .request_authenticated(Method::GET, "/api/v1/dashboard/profit-loss", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .request_authenticated(Method::POST, "/api/v1/dashboard/rebuild", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
