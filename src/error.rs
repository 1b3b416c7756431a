use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde_json::json;

use crate::auth::AuthError;
use crate::domain::order::OrderStatus;
use crate::geo::GeoError;
use crate::workflow::WorkflowError;

// ============================================================================
// API Errors - what callers see
// ============================================================================
//
// Every failure renders as { success: false, errorKind, message }.
// Backend details stay in the log; callers get a generic message.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidGeometry(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    OrderNotFound(String),

    #[error("{message}")]
    AlreadyResolved {
        message: String,
        current_status: OrderStatus,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "InvalidInput",
            ApiError::InvalidGeometry(_) => "InvalidGeometry",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "NotFound",
            ApiError::OrderNotFound(_) => "OrderNotFound",
            ApiError::AlreadyResolved { .. } => "AlreadyResolved",
            ApiError::Internal(_) => "Internal",
        }
    }
}

fn already_resolved_message(current: OrderStatus) -> String {
    match current {
        OrderStatus::Accepted | OrderStatus::Rejected => {
            format!("Order already {current} by another seller")
        }
        other => format!("Order is already {other}"),
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidInput(message) => ApiError::InvalidInput(message),
            WorkflowError::Unauthorized(message) => ApiError::Unauthorized(message),
            WorkflowError::Forbidden(message) => ApiError::Forbidden(message),
            WorkflowError::NotFound(id) => ApiError::NotFound(format!("Order not found: {id}")),
            WorkflowError::OrderNotFound(id) => ApiError::OrderNotFound(format!("Order not found: {id}")),
            WorkflowError::AlreadyResolved { current_status, .. } => ApiError::AlreadyResolved {
                message: already_resolved_message(current_status),
                current_status,
            },
            WorkflowError::Geo(e @ (GeoError::InvalidGeometry { .. } | GeoError::InvalidRadius(_))) => {
                ApiError::InvalidGeometry(e.to_string())
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized(message) => ApiError::Unauthorized(message),
            AuthError::Forbidden(message) => ApiError::Forbidden(message),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidGeometry(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyResolved { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "errorKind": self.kind(),
            "message": message,
        });
        if let ApiError::AlreadyResolved { current_status, .. } = self {
            body["currentStatus"] = json!(current_status);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Malformed JSON bodies surface as `InvalidInput` instead of actix's
/// plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ApiError::InvalidInput(err.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use actix_web::body::to_bytes;
    use uuid::Uuid;

    async fn body_of(err: ApiError) -> serde_json::Value {
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::from(WorkflowError::InvalidInput("x".into())), 400),
            (ApiError::from(AuthError::Unauthorized("x".into())), 401),
            (ApiError::from(WorkflowError::from(AuthError::Unauthorized("x".into()))), 401),
            (ApiError::from(WorkflowError::Forbidden("x".into())), 403),
            (ApiError::from(WorkflowError::NotFound(Uuid::nil())), 404),
            (ApiError::from(WorkflowError::OrderNotFound(Uuid::nil())), 404),
            (
                ApiError::from(WorkflowError::AlreadyResolved {
                    order_id: Uuid::nil(),
                    current_status: OrderStatus::Accepted,
                }),
                409,
            ),
            (ApiError::from(WorkflowError::Geo(GeoError::InvalidRadius(0.0))), 400),
            (ApiError::from(WorkflowError::Store(StoreError::Backend("down".into()))), 500),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code, "{err:?}");
        }
    }

    #[actix_web::test]
    async fn test_already_resolved_body_carries_current_status() {
        let err = ApiError::from(WorkflowError::AlreadyResolved {
            order_id: Uuid::nil(),
            current_status: OrderStatus::Rejected,
        });

        let body = body_of(err).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errorKind"], "AlreadyResolved");
        assert_eq!(body["currentStatus"], "rejected");
        assert_eq!(body["message"], "Order already rejected by another seller");
    }

    #[test]
    fn test_missing_order_kind_depends_on_operation() {
        assert_eq!(ApiError::from(WorkflowError::NotFound(Uuid::nil())).kind(), "NotFound");
        assert_eq!(ApiError::from(WorkflowError::OrderNotFound(Uuid::nil())).kind(), "OrderNotFound");
    }

    #[actix_web::test]
    async fn test_internal_errors_hide_details() {
        let err = ApiError::from(WorkflowError::Store(StoreError::Backend("node 10.0.0.3 timed out".into())));

        let body = body_of(err).await;
        assert_eq!(body["errorKind"], "Internal");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_already_resolved_message_for_later_states() {
        assert_eq!(already_resolved_message(OrderStatus::Shipped), "Order is already shipped");
    }
}
