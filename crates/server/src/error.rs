use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clubhouse_api::ServiceError;

/// Unified API error type.
///
/// Produces `{"error": "<message>"}` JSON responses.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    message: String,
}

impl ApiErr {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                Self::internal("internal server error")
            }
            ServiceError::Unavailable(msg) => {
                tracing::warn!("backend unavailable: {msg}");
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    message: msg,
                }
            }
            other => Self {
                status: StatusCode::from_u16(other.status_code())
                    .unwrap_or(StatusCode::BAD_REQUEST),
                message: other.message().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
