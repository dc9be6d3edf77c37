//! Error type shared by the inference service, the store and the client.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Pixel payload is neither 784 flat values nor a 28x28 grid
    #[error("invalid input shape: {0}")]
    InvalidShape(String),

    /// Pixel value is NaN or outside f32 range
    #[error("invalid pixel value: {0}")]
    InvalidPixel(String),

    /// Request body could not be decoded
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Uploaded drawing could not be decoded
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Label or class outside 0-9, confidence outside 0-100
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Model artifact could not be loaded or prepared
    #[error("model error: {0}")]
    Model(String),

    /// Forward pass failed or produced an unexpected output
    #[error("inference error: {0}")]
    Inference(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Store file was written by an incompatible schema
    #[error("schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Inference service answered with a non-success status
    #[error("inference service returned {status}: {detail}")]
    Remote { status: u16, detail: String },
}

impl From<image::ImageError> for ServiceError {
    fn from(err: image::ImageError) -> Self {
        ServiceError::InvalidImage(err.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidShape(_)
            | ServiceError::InvalidPixel(_)
            | ServiceError::InvalidRequest(_)
            | ServiceError::InvalidImage(_)
            | ServiceError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("rejected request: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let err = ServiceError::InvalidShape("10 values".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("invalid input shape"));

        let err = ServiceError::InvalidRecord("label 12".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ServiceError::InvalidPixel("pixel 0 is inf".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_map_to_internal_error() {
        let err = ServiceError::Inference("expected 10 logits, got 3".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ServiceError::Model("missing".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
