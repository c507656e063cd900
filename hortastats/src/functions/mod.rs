//! Function handlers exposed over HTTP
//!
//! Each handler is a stateless function from one request to one response,
//! the way a serverless platform invokes them. This module organizes
//! handlers into logical submodules:
//! - `auth`: credential check and token issue
//! - `posts`: post CRUD
//! - `images`: image upload and download
//! - `aliases`: camelCase/snake_case field resolution for post bodies
//!
//! All handlers follow the pattern:
//! - Take the shared `AppState` and the request
//! - Return `Result<FunctionResponse, AppError>`; `dispatch` turns errors
//!   into the `{error}` envelope
//!
//! Every response carries permissive CORS headers and every `OPTIONS`
//! request is answered with an empty 200.

pub mod aliases;
pub mod auth;
pub mod images;
pub mod posts;

use crate::app::AppState;
use crate::config::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN};
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// One handler invocation
#[derive(Debug, Clone, Default)]
pub struct FunctionRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FunctionRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = serde_json::to_vec(body)?;
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Parse the body as JSON
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(AppError::Validation("Request body is required".to_string()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
    }

    /// Parse the body as a JSON object
    pub fn json_object(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match self.json_body::<serde_json::Value>()? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(AppError::Validation(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    /// Required numeric `id` query parameter
    pub fn required_id(&self, what: &str) -> Result<i64> {
        let raw = self
            .query_param("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation(format!("{} ID is required", what)))?;

        raw.parse()
            .map_err(|_| AppError::Validation(format!("Invalid {} ID: {}", what.to_lowercase(), raw)))
    }
}

/// Result of one handler invocation
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FunctionResponse {
    fn with_cors(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![
                (
                    "Access-Control-Allow-Origin".to_string(),
                    CORS_ALLOW_ORIGIN.to_string(),
                ),
                (
                    "Access-Control-Allow-Headers".to_string(),
                    CORS_ALLOW_HEADERS.to_string(),
                ),
                (
                    "Access-Control-Allow-Methods".to_string(),
                    CORS_ALLOW_METHODS.to_string(),
                ),
            ],
            body,
        }
    }

    /// Empty answer to a CORS preflight
    pub fn preflight() -> Self {
        Self::with_cors(200, Vec::new())
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::bytes(status, "application/json", body))
    }

    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let mut response = Self::with_cors(status, body);
        response
            .headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        response
    }

    /// Error envelope for a failed invocation
    pub fn error(err: &AppError) -> Self {
        let status = err.status_code();

        let body = match err {
            AppError::NotConfigured => json!({ "error": err.to_string() }),
            _ if status == 500 => {
                tracing::error!("API error: {}", err);
                json!({ "error": "Internal server error", "details": err.to_string() })
            }
            _ => json!({ "error": err.to_string() }),
        };

        // A json! value always serializes
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self::bytes(status, "application/json", bytes)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Name of the function a path addresses: its last non-empty segment.
///
/// `/posts`, `/posts/` and `/.netlify/functions/posts` all address `posts`.
fn function_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Route one request to its handler and shape the response
pub async fn dispatch(state: &AppState, request: FunctionRequest) -> FunctionResponse {
    if request.method == "OPTIONS" {
        return FunctionResponse::preflight();
    }

    tracing::debug!("{} {}", request.method, request.path);

    let result = match function_name(&request.path) {
        "auth" => auth::handle(state, &request).await,
        "posts" => posts::handle(state, &request).await,
        "images" => images::handle(state, &request).await,
        _ => FunctionResponse::json(404, &json!({ "error": "Not found" })),
    };

    match result {
        Ok(response) => response,
        Err(err) => FunctionResponse::error(&err),
    }
}
