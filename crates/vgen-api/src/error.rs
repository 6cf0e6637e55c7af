//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vgen_store::StoreError;

use crate::config::is_production_environment;
use crate::services::WorkflowError;

pub type ApiResult<T> = Result<T, ApiError>;

const GENERIC_INTERNAL: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// Provider failed or was unreachable.
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),

    /// Detail is logged, never returned.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Configuration(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Conflict(_) => "conflict",
            ApiError::BadGateway(_) => "provider_error",
            ApiError::GatewayTimeout(_) => "provider_timeout",
            ApiError::Configuration(_) | ApiError::Internal(_) => "internal",
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Unauthorized => ApiError::unauthorized("Unauthorized"),
            WorkflowError::NotFound(msg) => ApiError::NotFound(msg),
            WorkflowError::InvalidInput(msg) => ApiError::BadRequest(msg),
            e @ WorkflowError::QuotaExceeded { .. } => ApiError::Forbidden(format!(
                "{}. Upgrade your plan to generate more videos this month.",
                e
            )),
            WorkflowError::Configuration(detail) => ApiError::Configuration(detail),
            WorkflowError::ProviderTaskFailure(_) => ApiError::BadGateway("Video generation failed".to_string()),
            WorkflowError::ProviderTransport(_) => {
                ApiError::BadGateway("Video generation service is unavailable".to_string())
            }
            WorkflowError::ProviderTimeout(_) => ApiError::GatewayTimeout("Video generation timed out".to_string()),
            WorkflowError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::not_found("Video not found"),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            e @ StoreError::QuotaExceeded { .. } => ApiError::Forbidden(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::Configuration(_) => {
                tracing::error!(error = %self, "Configuration error");
                GENERIC_INTERNAL.to_string()
            }
            ApiError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                // Don't expose internal error details in production
                let production = std::env::var("ENVIRONMENT")
                    .map(|env| is_production_environment(&env))
                    .unwrap_or(false);
                if production {
                    GENERIC_INTERNAL.to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    async fn message_of(e: ApiError) -> String {
        let body = axum::body::to_bytes(e.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["message"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_workflow_status_mapping() {
        let cases = [
            (WorkflowError::Unauthorized, StatusCode::UNAUTHORIZED),
            (WorkflowError::InvalidInput("Invalid preset".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::NotFound("User not found".into()), StatusCode::NOT_FOUND),
            (WorkflowError::QuotaExceeded { limit: 3 }, StatusCode::FORBIDDEN),
            (WorkflowError::ProviderTaskFailure("x".into()), StatusCode::BAD_GATEWAY),
            (WorkflowError::ProviderTransport("x".into()), StatusCode::BAD_GATEWAY),
            (WorkflowError::ProviderTimeout(Duration::from_secs(300)), StatusCode::GATEWAY_TIMEOUT),
            (WorkflowError::Configuration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (WorkflowError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (workflow, status) in cases {
            assert_eq!(ApiError::from(workflow).status_code(), status);
        }
    }

    #[test]
    fn test_provider_detail_is_not_exposed() {
        let e = ApiError::from(WorkflowError::ProviderTaskFailure("task abc: NSFW".into()));
        assert!(!e.to_string().contains("NSFW"));
    }

    #[test]
    fn test_quota_message_names_limit() {
        let e = ApiError::from(WorkflowError::QuotaExceeded { limit: 3 });
        assert!(e.to_string().contains("3 videos"));
    }

    #[tokio::test]
    #[serial]
    async fn test_internal_detail_hidden_in_production_any_case() {
        std::env::set_var("ENVIRONMENT", "Production");
        let message = message_of(ApiError::Internal("db password rejected".into())).await;
        std::env::remove_var("ENVIRONMENT");
        assert_eq!(message, GENERIC_INTERNAL);

        let message = message_of(ApiError::Internal("db password rejected".into())).await;
        assert!(message.contains("db password rejected"));
    }

    #[tokio::test]
    async fn test_configuration_detail_always_hidden() {
        let message = message_of(ApiError::Configuration("VIDEO_PROVIDER_API_TOKEN is not set".into())).await;
        assert_eq!(message, GENERIC_INTERNAL);
    }
}
