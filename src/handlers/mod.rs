use axum::Json;
use axum::http::StatusCode;

use crate::error::EngineError;
use crate::models::common::ErrorResponse;

pub mod arrears;
pub mod attendance;
pub mod forecast;
pub mod stipends;

/// Single EngineError -> HTTP mapping used by every handler.
pub(crate) fn error_response(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        EngineError::Validation(_) | EngineError::Token(_) => StatusCode::BAD_REQUEST,
        EngineError::LocationRejected { .. } => StatusCode::FORBIDDEN,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::StateConflict { .. } | EngineError::AlreadyCheckedIn { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::Db(_) | EngineError::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Internal error: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
