//! Mapping of analysis failures onto HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chess_analysis::AnalysisError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the API handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// The request body is not a JSON analysis request.
    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_help: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Body(_) | ApiError::Analysis(AnalysisError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Analysis(err) => err.kind(),
            ApiError::Body(_) => "invalid_input",
        }
    }

    fn body(&self) -> ErrorBody {
        let install_help = match self {
            ApiError::Analysis(err) => err.install_help().map(str::to_string),
            ApiError::Body(_) => None,
        };
        ErrorBody {
            detail: self.to_string(),
            kind: self.kind().to_string(),
            install_help,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Analysis request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "Rejected analysis request");
        }
        (status, Json(self.body())).into_response()
    }
}
