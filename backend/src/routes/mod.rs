//! API route definitions
//!
//! Everything except the health check sits behind the JWT auth layer.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{
    adjustments, alerts, goods_receipts, health, invoices, notifications, purchase_orders,
    serials, stock, transfers, warehouses,
};
use crate::middleware::auth_middleware;
use crate::AppState;

/// Build the `/api/v1` router
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(protected_routes().route_layer(middleware::from_fn(auth_middleware)))
        .route("/health", get(health::health_check))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(stock_routes())
        .merge(goods_receipt_routes())
        .merge(purchase_order_routes())
        .merge(invoice_routes())
        .merge(transfer_routes())
        .merge(adjustment_routes())
        .merge(alert_routes())
        .merge(notification_routes())
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/warehouses",
            get(warehouses::list_warehouses).post(warehouses::create_warehouse),
        )
        .route("/warehouses/:id", get(warehouses::get_warehouse))
        .route(
            "/products",
            get(warehouses::list_products).post(warehouses::create_product),
        )
        .route("/products/:id", get(warehouses::get_product))
        .route("/warehouse-products", post(warehouses::stock_product))
        .route(
            "/warehouse-products/:id/critical-level",
            put(warehouses::update_critical_level),
        )
        .route(
            "/warehouse-products/:id/archive",
            post(warehouses::archive_stock_level),
        )
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses/:id/stock", get(stock::list_levels))
        .route("/stock/:id", get(stock::get_level))
        .route("/stock/:id/movements", get(stock::list_movements))
        .route("/stock/:id/adjust", post(stock::adjust))
        .route("/stock/:id/serials", get(serials::list_units))
        .route("/stock/:id/serials/:serial", get(serials::get_unit))
        .route("/serials/replace", post(serials::replace_unit))
}

fn goods_receipt_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/goods-receipts",
            get(goods_receipts::list).post(goods_receipts::create),
        )
        .route("/goods-receipts/:id", get(goods_receipts::get))
        .route(
            "/goods-receipts/:id/lines/:line_id/receive",
            post(goods_receipts::receive_line),
        )
        .route("/goods-receipts/:id/put-away", post(goods_receipts::put_away))
        .route("/goods-receipts/:id/cancel", post(goods_receipts::cancel))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchase-orders",
            get(purchase_orders::list).post(purchase_orders::create),
        )
        .route("/purchase-orders/:id", get(purchase_orders::get))
        .route("/purchase-orders/:id/approve", post(purchase_orders::approve))
        .route("/purchase-orders/:id/cancel", post(purchase_orders::cancel))
}

fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route("/invoices/:id", get(invoices::get))
        .route("/invoices/:id/issue", post(invoices::issue))
        .route("/invoices/:id/cancel", post(invoices::cancel))
        .route("/invoices/:id/payments", post(invoices::add_payment))
        .route(
            "/invoices/:id/payments/:payment_id/approve",
            post(invoices::approve_payment),
        )
        .route(
            "/invoices/:id/payments/:payment_id/reject",
            post(invoices::reject_payment),
        )
        .route(
            "/invoices/:id/payments/:payment_id",
            delete(invoices::delete_payment),
        )
}

fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(transfers::list).post(transfers::create))
        .route("/transfers/:id", get(transfers::get))
        .route("/transfers/:id/approve", post(transfers::approve))
        .route("/transfers/:id/reject", post(transfers::reject))
        .route("/transfers/:id/cancel", post(transfers::cancel))
        .route(
            "/transfers/:id/lines/:line_id/execute",
            post(transfers::execute_line),
        )
}

fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/adjustments",
            get(adjustments::list).post(adjustments::create),
        )
        .route("/adjustments/:id", get(adjustments::get))
        .route("/adjustments/:id/approve", post(adjustments::approve))
        .route("/adjustments/:id/reject", post(adjustments::reject))
        .route("/adjustments/:id/cancel", post(adjustments::cancel))
}

fn alert_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/alert-rules",
            get(alerts::list_rules).post(alerts::upsert_rule),
        )
        .route(
            "/alert-rules/:id",
            get(alerts::get_rule).delete(alerts::delete_rule),
        )
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_as_read))
        .route("/notifications/:id/read", post(notifications::mark_as_read))
        .route("/notifications/:id/dismiss", post(notifications::dismiss))
}
