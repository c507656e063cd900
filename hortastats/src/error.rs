//! Error types for HortaStats
//!
//! All errors use thiserror for structured error handling.
//! Handler errors are mapped to HTTP status codes and serialized
//! into the `{error}` envelope returned to clients.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Validation(String),

    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Image not found: {0}")]
    ImageNotFound(i64),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Database not configured")]
    NotConfigured,

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// HTTP status code reported by the function handlers for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::Base64(_) => 400,
            AppError::InvalidCredentials => 401,
            AppError::PostNotFound(_) | AppError::ImageNotFound(_) => 404,
            AppError::MethodNotAllowed => 405,
            AppError::PayloadTooLarge => 413,
            _ => 500,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
