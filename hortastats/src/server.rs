//! HTTP/1.1 host for the function handlers
//!
//! Reads one request per connection with `httparse`, hands it to
//! `functions::dispatch` and writes the response back with
//! `Connection: close`. Routing, CORS and error shaping all live in the
//! handlers; this module only moves bytes.

use crate::app::AppState;
use crate::config::MAX_REQUEST_BODY_BYTES;
use crate::error::{AppError, Result};
use crate::functions::{self, FunctionRequest, FunctionResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

const READ_CHUNK_SIZE: usize = 8192;
const MAX_HEADER_BYTES: usize = 64 * 1024;
const MAX_HEADERS: usize = 64;

/// Bind the listener the function host accepts on
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, one task per connection
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        let (socket, remote_addr) = listener.accept().await?;

        // Disable Nagle's algorithm for lower latency
        let _ = socket.set_nodelay(true);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &state).await {
                tracing::warn!("Connection handler error ({}): {}", remote_addr, e);
            }
        });
    }
}

async fn handle_connection<S>(mut socket: S, state: &AppState) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match read_request(&mut socket).await {
        Ok(Some(request)) => functions::dispatch(state, request).await,
        Ok(None) => return Ok(()),
        Err(e @ (AppError::Validation(_) | AppError::PayloadTooLarge)) => {
            FunctionResponse::error(&e)
        }
        Err(e) => return Err(e),
    };

    write_response(&mut socket, &response).await
}

/// Read one request. `None` when the peer closed before sending anything.
async fn read_request<S>(socket: &mut S) -> Result<Option<FunctionRequest>>
where
    S: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(AppError::Validation("Incomplete HTTP request".to_string()));
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(AppError::Validation("Request headers too large".to_string()));
        }
    };

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);
    match parsed.parse(&buf[..header_end]) {
        Ok(httparse::Status::Complete(_)) => {}
        _ => return Err(AppError::Validation("Invalid HTTP request".to_string())),
    }

    let method = parsed.method.unwrap_or("GET").to_string();
    let (path, query) = split_path_and_query(parsed.path.unwrap_or("/"));
    let path = path.to_string();

    let mut header_map = HashMap::with_capacity(parsed.headers.len());
    for header in parsed.headers.iter() {
        let value = String::from_utf8_lossy(header.value).into_owned();
        header_map.insert(header.name.to_ascii_lowercase(), value);
    }

    let content_length: usize = match header_map.get("content-length") {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Invalid Content-Length".to_string()))?,
        None => 0,
    };
    if content_length > MAX_REQUEST_BODY_BYTES {
        return Err(AppError::PayloadTooLarge);
    }

    let mut body = buf.split_off(header_end);
    body.truncate(content_length);
    if body.len() < content_length {
        let already_read = body.len();
        body.resize(content_length, 0);
        socket.read_exact(&mut body[already_read..]).await?;
    }

    let mut request = FunctionRequest::new(&method, &path);
    request.query = query;
    request.headers = header_map;
    request.body = body;

    Ok(Some(request))
}

async fn write_response<S>(socket: &mut S, response: &FunctionResponse) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    head.push_str("Connection: close\r\n\r\n");

    socket.write_all(head.as_bytes()).await?;
    socket.write_all(&response.body).await?;
    socket.flush().await?;

    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn split_path_and_query(target: &str) -> (&str, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => {
            let params = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
            (path, params)
        }
        None => (target, HashMap::new()),
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::duplex;

    async fn roundtrip(raw: &[u8]) -> String {
        let state = AppState::new(Config::default());
        let (mut client, server) = duplex(64 * 1024);

        client.write_all(raw).await.unwrap();
        handle_connection(server, &state).await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_get_posts_over_http() {
        let response = roundtrip(b"GET /posts HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(response.ends_with("{\"posts\":[]}"));
    }

    #[tokio::test]
    async fn test_options_over_http() {
        let response =
            roundtrip(b"OPTIONS /posts?id=3 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Length: 0\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_body_is_read_by_content_length() {
        let body = r#"{"username":"admin","password":"admin123"}"#;
        let raw = format!(
            "POST /auth HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let response = roundtrip(raw.as_bytes()).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("\"role\":\"admin\""));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_before_reading() {
        let raw = format!(
            "POST /posts HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n",
            MAX_REQUEST_BODY_BYTES + 1
        );

        let response = roundtrip(raw.as_bytes()).await;

        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.ends_with("{\"error\":\"Request body too large\"}"));
    }

    #[tokio::test]
    async fn test_garbage_is_bad_request() {
        let response = roundtrip(b"\x00\x01 nonsense\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_split_path_and_query() {
        let (path, query) = split_path_and_query("/posts?id=12&note=a%20b");
        assert_eq!(path, "/posts");
        assert_eq!(query.get("id").map(String::as_str), Some("12"));
        assert_eq!(query.get("note").map(String::as_str), Some("a b"));

        let (path, query) = split_path_and_query("/images");
        assert_eq!(path, "/images");
        assert!(query.is_empty());
    }
}
