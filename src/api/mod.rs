// ============================================================================
// HTTP API - actix-web routes
// ============================================================================
//
// POST  /api/orders                    buyer   place an order
// GET   /api/orders                    seller  every order, newest first
// GET   /api/orders/buyer/{buyer_id}   buyer   own orders, newest first
// GET   /api/orders/{order_id}         any     one order
// PATCH /api/orders/{order_id}/respond seller  accept / reject
// GET   /api/events                    any     SSE session on own topic
// GET   /health
//
// ============================================================================

mod events;
mod orders;

use actix_web::{web, HttpResponse, Responder};

use crate::error::json_config;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/orders")
                        .route(web::post().to(orders::place_order))
                        .route(web::get().to(orders::list_all_orders)),
                )
                .route("/orders/buyer/{buyer_id}", web::get().to(orders::list_orders_for_buyer))
                .route("/orders/{order_id}", web::get().to(orders::get_order))
                .route("/orders/{order_id}/respond", web::patch().to(orders::respond_to_order))
                .route("/events", web::get().to(events::open_session)),
        );
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "pharmacy-dispatch"
    }))
}
