use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::auth::Principal;
use crate::domain::order::{PlaceOrder, RespondToOrder};
use crate::error::ApiError;
use crate::workflow::OrderWorkflow;

fn parse_order_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidInput(format!("Invalid order id: {raw}")))
}

/// POST /api/orders
pub async fn place_order(
    workflow: web::Data<OrderWorkflow>,
    principal: Principal,
    body: web::Json<PlaceOrder>,
) -> Result<HttpResponse, ApiError> {
    let placed = workflow.place_order(&principal, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "orderId": placed.order.id,
        "status": placed.order.status,
        "matchedSellerCount": placed.matched_seller_count,
        "order": placed.order,
    })))
}

/// PATCH /api/orders/{order_id}/respond
pub async fn respond_to_order(
    workflow: web::Data<OrderWorkflow>,
    principal: Principal,
    path: web::Path<String>,
    body: web::Json<RespondToOrder>,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;
    let order = workflow.respond_to_order(&principal, order_id, &body).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "orderId": order.id,
        "status": order.status,
        "order": order,
    })))
}

/// GET /api/orders/{order_id}
pub async fn get_order(
    workflow: web::Data<OrderWorkflow>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order = workflow.get_order(&principal, parse_order_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

/// GET /api/orders/buyer/{buyer_id}
pub async fn list_orders_for_buyer(
    workflow: web::Data<OrderWorkflow>,
    principal: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let orders = workflow.list_orders_for_buyer(&principal, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": orders.len(), "orders": orders })))
}

/// GET /api/orders
pub async fn list_all_orders(
    workflow: web::Data<OrderWorkflow>,
    principal: Principal,
) -> Result<HttpResponse, ApiError> {
    let orders = workflow.list_all_orders(&principal).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "count": orders.len(), "orders": orders })))
}
