//! Posts function
//!
//! `GET` lists, `POST` creates, `PUT ?id=` updates and `DELETE ?id=`
//! deletes diary posts.

use super::aliases::resolve_post_fields;
use super::{FunctionRequest, FunctionResponse};
use crate::app::AppState;
use crate::error::{AppError, Result};
use serde_json::json;

pub async fn handle(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    match request.method.as_str() {
        "GET" => get_posts(state).await,
        "POST" => create_post(state, request).await,
        "PUT" => update_post(state, request).await,
        "DELETE" => delete_post(state, request).await,
        _ => Err(AppError::MethodNotAllowed),
    }
}

/// List all posts with their images
async fn get_posts(state: &AppState) -> Result<FunctionResponse> {
    let posts = state.services().await?.posts.list_posts().await?;

    FunctionResponse::json(200, &json!({ "posts": posts }))
}

/// Create a post from either field spelling
async fn create_post(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    let fields = resolve_post_fields(&request.json_object()?);

    let post = state.services().await?.posts.create_post(&fields).await?;

    FunctionResponse::json(
        201,
        &json!({ "message": "Post created successfully", "post": post }),
    )
}

/// Update the provided fields of a post
async fn update_post(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    let id = request.required_id("Post")?;
    let fields = resolve_post_fields(&request.json_object()?);

    let post = state.services().await?.posts.update_post(id, &fields).await?;

    FunctionResponse::json(
        200,
        &json!({ "message": "Post updated successfully", "post": post }),
    )
}

/// Delete a post and its images
async fn delete_post(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    let id = request.required_id("Post")?;

    state.services().await?.posts.delete_post(id).await?;

    FunctionResponse::json(200, &json!({ "message": "Post deleted successfully" }))
}
