use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockLedger API",
        version = "0.1.0",
        description = r#"
# StockLedger Inventory Ledger API

Backend engine for inventory management: a product registry, an append-only
stock movement ledger, purchase order and invoice workflows, and dashboard
reporting.

## Authentication

All business endpoints require a bearer token issued by the external auth
service:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Error responses carry a `message` field plus a request id for tracing:

```json
{
  "error": "Conflict",
  "message": "insufficient stock for product WIDGET-9: requested 10, available 7 (short by 3)",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-07-09T10:30:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20,
max 100) query parameters.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "products", description = "Product registry endpoints"),
        (name = "stock-movements", description = "Movement ledger endpoints"),
        (name = "purchase-orders", description = "Purchase order workflow endpoints"),
        (name = "invoices", description = "Invoice workflow endpoints"),
        (name = "dashboard", description = "Reporting endpoints")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::deactivate_product,
        crate::handlers::products::activate_product,
        crate::handlers::products::update_stock,

        // Stock movements
        crate::handlers::stock_movements::list_movements,
        crate::handlers::stock_movements::list_movements_for_product,
        crate::handlers::stock_movements::adjust_stock,

        // Purchase orders
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::deliver_purchase_order,
        crate::handlers::purchase_orders::cancel_purchase_order,

        // Invoices
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::pay_invoice,
        crate::handlers::invoices::cancel_invoice,

        // Dashboard
        crate::handlers::dashboard::get_overview,
        crate::handlers::dashboard::rebuild_dashboard,
        crate::handlers::dashboard::get_stock_report,
        crate::handlers::dashboard::get_profit_loss,
        crate::handlers::dashboard::get_top_insights,
    ),
    components(
        schemas(
            // Product types
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::UpdateStockRequest,

            // Stock movement types
            crate::handlers::stock_movements::AdjustStockRequest,

            // Purchase order types
            crate::handlers::purchase_orders::CreatePurchaseOrderRequest,
            crate::handlers::purchase_orders::UpdatePurchaseOrderRequest,
            crate::handlers::purchase_orders::PurchaseOrderItemRequest,

            // Invoice types
            crate::handlers::invoices::CreateInvoiceRequest,
            crate::handlers::invoices::InvoiceItemRequest,

            // Reporting types
            crate::services::dashboard::OverviewStats,
            crate::services::dashboard::StockReport,
            crate::services::dashboard::ProfitLoss,
            crate::services::dashboard::TopInsights,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("StockLedger API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/stock-movements"));
    }
}
