//! Error types for the server

use crate::error::CarPriceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Well-formed request with unacceptable content
    #[error("Invalid input: {0}")]
    Unprocessable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CarPriceError> for ServerError {
    fn from(err: CarPriceError) -> Self {
        match err.root_cause() {
            CarPriceError::Validation { .. } => ServerError::Unprocessable(err.root_cause().to_string()),
            CarPriceError::ArtifactNotFound { .. } | CarPriceError::FeatureNotFound(_) => {
                ServerError::NotFound(err.root_cause().to_string())
            }
            _ => ServerError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Stage, StageContext};

    #[test]
    fn test_validation_maps_to_422() {
        let err: ServerError = CarPriceError::validation("year", "too old").into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_wrapped_inference_error_is_500() {
        let failed: crate::error::Result<()> = Err(CarPriceError::Inference("nan".to_string()));
        let err: ServerError = failed.stage(Stage::Inference, "running model").unwrap_err().into();
        assert!(matches!(err, ServerError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
