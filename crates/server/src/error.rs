use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("No PPTX binary provided")]
    MissingBinary,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0:#}")]
    Processing(anyhow::Error),
}

/// Body of every failed request.
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, trace) = match &self {
            Self::MissingBinary | Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None),
            Self::Processing(e) => {
                log::error!("Error processing PPTX: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Some(format!("{:?}", e)))
            }
        };

        let body = Json(FailureBody {
            success: false,
            error: self.to_string(),
            trace,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_processing_message_includes_cause() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("Invalid byte 33, offset 0."));
        let err = ServiceError::Processing(err.context("Failed to decode pptx_binary").unwrap_err());
        assert_eq!(
            err.to_string(),
            "Failed to decode pptx_binary: Invalid byte 33, offset 0."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::MissingBinary.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Processing(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
