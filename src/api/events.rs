use actix_web::{http::header, web, HttpResponse};

use crate::auth::Principal;
use crate::error::ApiError;
use crate::notifications::{BusHandle, Topic};

/// GET /api/events
///
/// One server-sent-events session on the caller's own topic. The session
/// lives as long as the response stream.
pub async fn open_session(bus: web::Data<BusHandle>, principal: Principal) -> Result<HttpResponse, ApiError> {
    let topic = Topic::for_principal(&principal);
    let stream = bus
        .open_session(vec![topic.clone()])
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(session_id = %stream.session_id(), topic = %topic, "📡 Event stream opened");

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream))
}
