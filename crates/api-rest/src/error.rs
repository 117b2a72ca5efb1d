use api_shared::ErrorRes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use his_core::HisError;

/// Failure of a request, rendered as an `ErrorRes` body.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed `Authorization` header.
    Unauthorized,
    Core(HisError),
}

impl From<HisError> for ApiError {
    fn from(e: HisError) -> Self {
        Self::Core(e)
    }
}

impl From<his_uuid::UuidError> for ApiError {
    fn from(e: his_uuid::UuidError) -> Self {
        Self::Core(e.into())
    }
}

/// HTTP status for a core error.
pub fn status_for(error: &HisError) -> StatusCode {
    match error {
        HisError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        HisError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        HisError::NotFound { .. } => StatusCode::NOT_FOUND,
        HisError::InvalidInput(_)
        | HisError::Text(_)
        | HisError::Uuid(_)
        | HisError::AmbiguousId { .. }
        | HisError::InvalidStaging(_) => StatusCode::BAD_REQUEST,
        HisError::DuplicateUsername(_)
        | HisError::DuplicateEmail(_)
        | HisError::AlreadyClosed { .. }
        | HisError::NotClosed { .. }
        | HisError::AlreadyAssigned(_)
        | HisError::RoomFull(_)
        | HisError::RoomEmpty(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication required".to_string()),
            Self::Core(e) => {
                let status = status_for(e);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("request failed: {e:?}");
                    (status, "Internal error".to_string())
                } else {
                    (status, e.to_string())
                }
            }
        };

        let body = Json(ErrorRes { error: message });
        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="HIS""#)],
                body,
            )
                .into_response()
        } else {
            (status, body).into_response()
        }
    }
}
