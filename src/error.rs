use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("OTP not found or expired")]
    CodeNotFoundOrExpired,

    #[error("OTP expired")]
    CodeExpired,

    #[error("Invalid OTP")]
    CodeMismatch,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::CodeNotFoundOrExpired
            | AppError::CodeExpired
            | AppError::CodeMismatch => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Collaborator failures are logged server-side and surfaced as a
        // generic message so internals never leak to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "success": false, "error": message }));

        (status, body).into_response()
    }
}
