use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after a successful commit.
///
/// Events are fire-and-forget observability signals; they are never part of
/// the transaction that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Product registry events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductActivated(Uuid),
    ProductDeactivated(Uuid),

    // Movement ledger events
    StockMovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        movement_type: String,
        quantity: i32,
        previous_stock: i32,
        new_stock: i32,
        reference_type: String,
    },
    LowStockDetected {
        product_id: Uuid,
        sku: String,
        quantity: i32,
        threshold: i32,
    },

    // Purchase order events
    PurchaseOrderCreated(Uuid),
    PurchaseOrderUpdated(Uuid),
    PurchaseOrderDelivered(Uuid),
    PurchaseOrderCancelled(Uuid),

    // Invoice events
    InvoiceCreated(Uuid),
    InvoicePaid(Uuid),
    InvoiceCancelled(Uuid),

    // Reporting events
    DashboardRebuilt,
}

impl Event {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductActivated(_) => "product_activated",
            Event::ProductDeactivated(_) => "product_deactivated",
            Event::StockMovementRecorded { .. } => "stock_movement_recorded",
            Event::LowStockDetected { .. } => "low_stock_detected",
            Event::PurchaseOrderCreated(_) => "purchase_order_created",
            Event::PurchaseOrderUpdated(_) => "purchase_order_updated",
            Event::PurchaseOrderDelivered(_) => "purchase_order_delivered",
            Event::PurchaseOrderCancelled(_) => "purchase_order_cancelled",
            Event::InvoiceCreated(_) => "invoice_created",
            Event::InvoicePaid(_) => "invoice_paid",
            Event::InvoiceCancelled(_) => "invoice_cancelled",
            Event::DashboardRebuilt => "dashboard_rebuilt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// Used after commit where the write must not be reported as failed
    /// because observability lagged.
    pub async fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        if let Err(err) = self.send(event).await {
            warn!(event = kind, error = %err, "Dropped domain event");
        }
    }
}

/// Consumes events from the channel and logs them.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        metrics::counter!("stockledger_events_total", 1, "kind" => event.kind());
        match &event {
            Event::StockMovementRecorded {
                movement_id,
                product_id,
                movement_type,
                quantity,
                previous_stock,
                new_stock,
                reference_type,
            } => {
                info!(
                    movement_id = %movement_id,
                    product_id = %product_id,
                    movement_type = %movement_type,
                    quantity = quantity,
                    previous_stock = previous_stock,
                    new_stock = new_stock,
                    reference_type = %reference_type,
                    "Stock movement recorded"
                );
            }
            Event::LowStockDetected {
                product_id,
                sku,
                quantity,
                threshold,
            } => {
                warn!(
                    product_id = %product_id,
                    sku = %sku,
                    quantity = quantity,
                    threshold = threshold,
                    "Product stock at or below threshold"
                );
            }
            other => {
                info!(event = other.kind(), payload = ?other, "Domain event");
            }
        }
    }
    info!("Event channel closed; event processor shutting down");
}
