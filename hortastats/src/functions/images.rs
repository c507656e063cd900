//! Images function
//!
//! `GET ?id=` serves the raw bytes of an image, `POST` uploads a base64
//! payload attached to a post.

use super::{FunctionRequest, FunctionResponse};
use crate::app::AppState;
use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::{json, Value};

/// Upload request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadImageRequest {
    #[serde(alias = "post_id")]
    post_id: Value,
    filename: String,
    #[serde(alias = "image_data")]
    image_data: String,
    #[serde(alias = "mime_type")]
    mime_type: String,
}

pub async fn handle(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    match request.method.as_str() {
        "GET" => get_image(state, request).await,
        "POST" => upload_image(state, request).await,
        _ => Err(AppError::MethodNotAllowed),
    }
}

async fn get_image(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    let id = request.required_id("Image")?;

    let image = state
        .services()
        .await?
        .images
        .get_image(id)
        .await?
        .ok_or(AppError::ImageNotFound(id))?;

    Ok(FunctionResponse::bytes(200, &image.mime_type, image.data))
}

async fn upload_image(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    let upload: UploadImageRequest = request.json_body()?;
    let post_id = post_id_from(&upload.post_id)?;

    let image = state
        .services()
        .await?
        .images
        .upload_image(post_id, &upload.filename, &upload.mime_type, &upload.image_data)
        .await?;

    FunctionResponse::json(200, &json!({ "image": image }))
}

/// Post ids arrive as numbers or numeric strings
fn post_id_from(value: &Value) -> Result<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| AppError::Validation("Post ID is required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::initialize_database;
    use crate::functions::dispatch;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn configured_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        AppState::with_pool(Config::default(), pool)
    }

    async fn create_post(state: &AppState) -> i64 {
        let request = FunctionRequest::new("POST", "/posts")
            .with_json(&json!({ "plantType": "Cucumber" }))
            .unwrap();
        let body = dispatch(state, request).await.json_body().unwrap();
        body["post"]["id"].as_i64().unwrap()
    }

    fn upload_request(post_id: Value, data: &[u8]) -> FunctionRequest {
        FunctionRequest::new("POST", "/images")
            .with_json(&json!({
                "postId": post_id,
                "filename": "leaf.jpg",
                "imageData": STANDARD.encode(data),
                "mimeType": "image/jpeg",
            }))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let state = configured_state().await;
        let post_id = create_post(&state).await;

        let response = dispatch(&state, upload_request(json!(post_id), b"\xff\xd8jpeg")).await;
        assert_eq!(response.status, 200);
        let image_id = response.json_body().unwrap()["image"]["id"].as_i64().unwrap();

        let request = FunctionRequest::new("GET", "/images").with_query("id", image_id.to_string());
        let response = dispatch(&state, request).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("image/jpeg"));
        assert_eq!(response.body, b"\xff\xd8jpeg");
    }

    #[tokio::test]
    async fn test_upload_accepts_string_post_id() {
        let state = configured_state().await;
        let post_id = create_post(&state).await;

        let response = dispatch(&state, upload_request(json!(post_id.to_string()), b"png")).await;

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_deleted_post_takes_images_with_it() {
        let state = configured_state().await;
        let post_id = create_post(&state).await;

        let mut image_ids = Vec::new();
        for _ in 0..2 {
            let response = dispatch(&state, upload_request(json!(post_id), b"img")).await;
            image_ids.push(response.json_body().unwrap()["image"]["id"].as_i64().unwrap());
        }

        let request = FunctionRequest::new("DELETE", "/posts").with_query("id", post_id.to_string());
        assert_eq!(dispatch(&state, request).await.status, 200);

        for id in image_ids {
            let request = FunctionRequest::new("GET", "/images").with_query("id", id.to_string());
            assert_eq!(dispatch(&state, request).await.status, 404);
        }
    }

    #[tokio::test]
    async fn test_missing_image_is_404() {
        let state = configured_state().await;

        let request = FunctionRequest::new("GET", "/images").with_query("id", "5");
        let response = dispatch(&state, request).await;

        assert_eq!(response.status, 404);
        assert_eq!(response.json_body().unwrap()["error"], "Image not found: 5");
    }

    #[tokio::test]
    async fn test_upload_to_missing_post_is_404() {
        let state = configured_state().await;

        let response = dispatch(&state, upload_request(json!(404), b"img")).await;

        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails() {
        let state = AppState::new(Config::default());

        let response = dispatch(&state, upload_request(json!(1), b"img")).await;

        assert_eq!(response.status, 500);
        assert_eq!(response.json_body().unwrap()["error"], "Database not configured");
    }
}
