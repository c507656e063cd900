//! Transports carrying facade calls to the function handlers
//!
//! `HttpTransport` talks to a deployed function host with reqwest.
//! `InProcessTransport` dispatches straight into the handlers, which is
//! how an embedded client or a test reaches them without a socket.

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::functions::{self, FunctionRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One call to a function handler
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    /// Function path, e.g. `/posts`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub token: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            token: None,
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// What came back from a function handler
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Final URL of the call, usable to address the resource again
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries one request to the function handlers.
///
/// An `Err` means the call never produced a response (connection refused,
/// DNS failure, broken stream). Non-2xx responses are `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Transport over HTTP
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is the prefix the function paths are appended to, e.g.
    /// `http://127.0.0.1:8888` or `https://example.org/.netlify/functions`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("HortaStats-Client")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| AppError::Generic(format!("Invalid HTTP method: {}", e)))?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse {
            status,
            url,
            content_type,
            body,
        })
    }
}

/// Transport that invokes the handlers in this process
#[derive(Clone)]
pub struct InProcessTransport {
    state: Arc<AppState>,
}

impl InProcessTransport {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut function_request = FunctionRequest::new(&request.method, &request.path);
        for (key, value) in &request.query {
            function_request = function_request.with_query(key, value.clone());
        }
        if let Some(token) = &request.token {
            function_request =
                function_request.with_header("authorization", format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            function_request = function_request.with_json(body)?;
        }

        let url = if request.query.is_empty() {
            request.path.clone()
        } else {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&request.query)
                .finish();
            format!("{}?{}", request.path, query)
        };

        let response = functions::dispatch(&self.state, function_request).await;

        Ok(ApiResponse {
            status: response.status,
            url,
            content_type: response.header("content-type").map(str::to_string),
            body: response.body,
        })
    }
}
