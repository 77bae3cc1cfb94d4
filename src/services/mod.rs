//! Business logic layer. Handlers stay thin; the rules that keep product
//! quantities, the movement ledger and the order workflows mutually
//! consistent live here.

pub mod categories;
pub mod dashboard;
pub mod invoices;
pub mod products;
pub mod purchase_orders;
pub mod staff;
pub mod stock_movements;
pub mod vendors;
