//! Auth function
//!
//! `POST {username, password}` returns `{token, user}`.

use super::{FunctionRequest, FunctionResponse};
use crate::app::AppState;
use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct LoginInput {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn handle(state: &AppState, request: &FunctionRequest) -> Result<FunctionResponse> {
    if request.method != "POST" {
        return Err(AppError::MethodNotAllowed);
    }

    let input: LoginInput = request.json_body()?;
    if input.username.is_empty() || input.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let (token, user) = state
        .services()
        .await?
        .auth
        .authenticate(&input.username, &input.password)?;

    FunctionResponse::json(200, &json!({ "token": token, "user": user }))
}
