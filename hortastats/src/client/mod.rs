//! Client data-access facade
//!
//! `HortaClient` is the single interface the UI talks to. Every method
//! returns an `Outcome`, serialized as `{success: true, data}` or
//! `{success: false, error}`.
//!
//! Reads and creates try the remote functions first. Any failure on that
//! path (no response, non-2xx status, malformed body) is logged and the
//! same operation is re-run against the `LocalStore`. Only the outcome of
//! the path that ran last is reported.
//!
//! Not every operation has both paths:
//! - `delete_post` only ever touches local storage
//! - `update_post`, `get_image` and `upload_image` are remote only and
//!   report `"Network error"` when no response arrives

pub mod local;
pub mod transport;

pub use local::{FileStore, LocalStore, MemoryStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, InProcessTransport, Transport};

use crate::config::{FALLBACK_PASSWORD, FALLBACK_USERNAME, TOKEN_STORAGE_KEY};
use crate::database::{ImageSummary, Post, PostFields, User};
use crate::error::{AppError, Result};
use crate::services::auth::admin_user;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// Uniform result of a facade call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(String),
}

impl<T> Outcome<T> {
    fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Failure(message) => Outcome::Failure(message),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Outcome::Success(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            Outcome::Failure(message) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", message)?;
            }
        }
        map.end()
    }
}

/// An image served by the images function
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    /// URL the image was served from
    pub url: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
struct AuthPayload {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct PostsPayload {
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct PostPayload {
    post: Post,
}

#[derive(Deserialize)]
struct ImagePayload {
    image: ImageSummary,
}

/// Facade over the remote functions and the local fallback store
pub struct HortaClient<T: Transport, S: LocalStore> {
    transport: T,
    store: S,
    token: Option<String>,
}

impl<T: Transport, S: LocalStore> HortaClient<T, S> {
    /// Build a client, restoring a token kept from an earlier session
    pub fn new(transport: T, store: S) -> Self {
        let token = store.get_item(TOKEN_STORAGE_KEY).unwrap_or_else(|e| {
            tracing::warn!("Could not read stored token: {}", e);
            None
        });

        Self {
            transport,
            store,
            token,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Hold a token and persist it for the rest of the session
    pub fn set_token(&mut self, token: String) {
        if let Err(e) = self.store.set_item(TOKEN_STORAGE_KEY, &token) {
            tracing::warn!("Could not persist token: {}", e);
        }
        self.token = Some(token);
    }

    /// Forget the token (logout)
    pub fn clear_token(&mut self) {
        if let Err(e) = self.store.remove_item(TOKEN_STORAGE_KEY) {
            tracing::warn!("Could not remove stored token: {}", e);
        }
        self.token = None;
    }

    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        request.token = self.token.clone();
        self.transport.send(request).await
    }

    /// Call a function and decode its JSON payload.
    ///
    /// Non-2xx statuses become errors carrying the handler's message.
    async fn call<P: DeserializeOwned>(&self, request: ApiRequest) -> Result<P> {
        let response = self.send(request).await?;
        let data: Value = serde_json::from_slice(&response.body)?;

        if !response.is_success() {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("API error");
            return Err(AppError::Generic(message.to_string()));
        }

        Ok(serde_json::from_value(data)?)
    }

    /// Authenticate, falling back to the built-in administrator pair
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Outcome<User> {
        let request = ApiRequest::new("POST", "/auth")
            .json(json!({ "username": username, "password": password }));

        match self.call::<AuthPayload>(request).await {
            Ok(payload) => {
                self.set_token(payload.token);
                Outcome::Success(payload.user)
            }
            Err(e) => {
                tracing::warn!("Remote functions failed, using local auth: {}", e);

                if username == FALLBACK_USERNAME && password == FALLBACK_PASSWORD {
                    self.set_token(format!("local-token-{}", Utc::now().timestamp_millis()));
                    Outcome::Success(admin_user(FALLBACK_USERNAME))
                } else {
                    Outcome::failure("Invalid credentials")
                }
            }
        }
    }

    /// List posts, newest first
    pub async fn get_posts(&self) -> Outcome<Vec<Post>> {
        match self.call::<PostsPayload>(ApiRequest::new("GET", "/posts")).await {
            Ok(payload) => Outcome::Success(payload.posts),
            Err(e) => {
                tracing::warn!("Remote functions failed, using local storage: {}", e);

                match local::load_posts(&self.store) {
                    Ok(posts) => Outcome::Success(posts),
                    Err(e) => {
                        tracing::error!("Error loading posts: {}", e);
                        Outcome::failure("Failed to load posts")
                    }
                }
            }
        }
    }

    /// Create a post
    pub async fn create_post(&self, fields: &PostFields) -> Outcome<Post> {
        let body = match serde_json::to_value(fields) {
            Ok(body) => body,
            Err(e) => return Outcome::failure(e.to_string()),
        };

        match self.call::<PostPayload>(ApiRequest::new("POST", "/posts").json(body)).await {
            Ok(payload) => Outcome::Success(payload.post),
            Err(e) => {
                tracing::warn!("Remote functions failed, using local storage: {}", e);

                match local::insert_post(&self.store, fields) {
                    Ok(post) => Outcome::Success(post),
                    Err(e) => {
                        tracing::error!("Error creating post: {}", e);
                        Outcome::failure("Failed to save post")
                    }
                }
            }
        }
    }

    /// Update a post. Remote only.
    pub async fn update_post(&self, id: i64, fields: &PostFields) -> Outcome<Post> {
        let body = match serde_json::to_value(fields) {
            Ok(body) => body,
            Err(e) => return Outcome::failure(e.to_string()),
        };
        let request = ApiRequest::new("PUT", "/posts").query("id", id).json(body);

        match self.send(request).await {
            Ok(response) => decode_remote::<PostPayload>(&response).map(|payload| payload.post),
            Err(e) => {
                tracing::warn!("Update failed: {}", e);
                Outcome::failure("Network error")
            }
        }
    }

    /// Delete a post. Local storage only.
    pub async fn delete_post(&self, id: i64) -> Outcome<()> {
        match local::remove_post(&self.store, id) {
            Ok(()) => Outcome::Success(()),
            Err(e) => {
                tracing::error!("Error deleting post: {}", e);
                Outcome::failure("Failed to delete post")
            }
        }
    }

    /// Fetch an image. Remote only.
    pub async fn get_image(&self, id: i64) -> Outcome<FetchedImage> {
        match self.send(ApiRequest::new("GET", "/images").query("id", id)).await {
            Ok(response) if response.is_success() => Outcome::Success(FetchedImage {
                url: response.url,
                mime_type: response.content_type,
                data: response.body,
            }),
            Ok(_) => Outcome::failure("Image not found"),
            Err(e) => {
                tracing::warn!("Image fetch failed: {}", e);
                Outcome::failure("Network error")
            }
        }
    }

    /// Upload an image for a post. Remote only.
    pub async fn upload_image(
        &self,
        post_id: i64,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Outcome<ImageSummary> {
        let request = ApiRequest::new("POST", "/images").json(json!({
            "postId": post_id,
            "filename": filename,
            "imageData": STANDARD.encode(data),
            "mimeType": mime_type,
        }));

        match self.send(request).await {
            Ok(response) => decode_remote::<ImagePayload>(&response).map(|payload| payload.image),
            Err(e) => {
                tracing::warn!("Image upload failed: {}", e);
                Outcome::failure("Network error")
            }
        }
    }
}

/// Outcome of a remote-only call that did get a response
fn decode_remote<P: DeserializeOwned>(response: &ApiResponse) -> Outcome<P> {
    let data: Value = match serde_json::from_slice(&response.body) {
        Ok(data) => data,
        Err(_) => return Outcome::failure("Network error"),
    };

    if !response.is_success() {
        let message = data
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("API error");
        return Outcome::failure(message);
    }

    match serde_json::from_value(data) {
        Ok(payload) => Outcome::Success(payload),
        Err(_) => Outcome::failure("Network error"),
    }
}

/// Client over HTTP with an on-disk fallback store
pub fn http_client(base_url: &str, store: FileStore) -> Result<HortaClient<HttpTransport, FileStore>> {
    Ok(HortaClient::new(HttpTransport::new(base_url)?, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::config::{Config, POSTS_STORAGE_KEY};
    use crate::database::initialize_database;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    /// Transport whose calls never reach a server
    struct OfflineTransport;

    #[async_trait]
    impl Transport for OfflineTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse> {
            Err(AppError::Generic("connection refused".to_string()))
        }
    }

    /// Transport answering every call with a 200 whose body is not the
    /// expected payload, like a proxy error page
    struct GarbledTransport {
        body: &'static [u8],
    }

    #[async_trait]
    impl Transport for GarbledTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            Ok(ApiResponse {
                status: 200,
                url: request.path,
                content_type: Some("text/html".to_string()),
                body: self.body.to_vec(),
            })
        }
    }

    fn offline_client() -> HortaClient<OfflineTransport, MemoryStore> {
        HortaClient::new(OfflineTransport, MemoryStore::new())
    }

    async fn online_client() -> HortaClient<InProcessTransport, MemoryStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();

        let state = Arc::new(AppState::with_pool(Config::default(), pool));
        HortaClient::new(InProcessTransport::new(state), MemoryStore::new())
    }

    fn tomato() -> PostFields {
        PostFields {
            plant_type: Some("Tomato".to_string()),
            plant_age: Some("2 months".to_string()),
            notes: Some("Staked today".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_offline_create_is_visible_to_get_posts() {
        let client = offline_client();

        let created = client.create_post(&tomato()).await.into_data().unwrap();
        assert!(created.id > 0);
        assert_eq!(created.author, "admin");

        let posts = client.get_posts().await.into_data().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, created.id);
        assert_eq!(posts[0].fields(), tomato());
    }

    #[tokio::test]
    async fn test_offline_get_posts_is_idempotent() {
        let client = offline_client();
        client.create_post(&tomato()).await;
        client.create_post(&PostFields::default()).await;

        let first = client.get_posts().await;
        let second = client.get_posts().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_offline_authenticate_accepts_builtin_admin() {
        let mut client = offline_client();

        let outcome = client.authenticate("admin", "admin123").await;

        assert_eq!(outcome.data().unwrap().role, "admin");
        assert!(client.is_authenticated());
        assert!(client.token().unwrap().starts_with("local-token-"));
        assert_eq!(
            client.store().get_item(TOKEN_STORAGE_KEY).unwrap().as_deref(),
            client.token()
        );
    }

    #[tokio::test]
    async fn test_offline_authenticate_rejects_others() {
        let mut client = offline_client();

        let outcome = client.authenticate("admin", "wrong").await;

        assert_eq!(outcome.error(), Some("Invalid credentials"));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_offline_update_and_images_have_no_fallback() {
        let client = offline_client();

        assert_eq!(client.update_post(1, &tomato()).await.error(), Some("Network error"));
        assert_eq!(client.get_image(1).await.error(), Some("Network error"));
        assert_eq!(
            client.upload_image(1, "a.png", "image/png", b"png").await.error(),
            Some("Network error")
        );
    }

    #[tokio::test]
    async fn test_malformed_success_bodies_fall_back() {
        for body in [&b"<html>"[..], &b"{\"unexpected\":true}"[..]] {
            let mut client = HortaClient::new(GarbledTransport { body }, MemoryStore::new());

            let created = client.create_post(&tomato()).await.into_data().unwrap();
            let posts = client.get_posts().await.into_data().unwrap();
            assert_eq!(posts, vec![created]);

            let user = client.authenticate("admin", "admin123").await.into_data().unwrap();
            assert_eq!(user.role, "admin");
            assert!(client.token().unwrap().starts_with("local-token-"));

            assert_eq!(client.update_post(1, &tomato()).await.error(), Some("Network error"));
            assert_eq!(
                client.upload_image(1, "a.png", "image/png", b"png").await.error(),
                Some("Network error")
            );
        }
    }

    #[tokio::test]
    async fn test_delete_only_touches_local_storage() {
        let client = online_client().await;
        let remote = client.create_post(&tomato()).await.into_data().unwrap();

        let local = local::insert_post(client.store(), &tomato()).unwrap();
        assert!(client.delete_post(local.id).await.is_success());
        assert!(client.delete_post(remote.id).await.is_success());

        let remaining = local::load_posts(client.store()).unwrap();
        assert!(remaining.is_empty());

        // The remote post survives a client-side delete
        let posts = client.get_posts().await.into_data().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, remote.id);
    }

    #[tokio::test]
    async fn test_online_round_trip_does_not_touch_local_storage() {
        let mut client = online_client().await;

        let user = client.authenticate("admin", "admin123").await.into_data().unwrap();
        assert_eq!(user.username, "admin");
        assert!(!client.token().unwrap().starts_with("local-token-"));

        let post = client.create_post(&tomato()).await.into_data().unwrap();
        let changes = PostFields {
            height: Some("1m".to_string()),
            ..Default::default()
        };
        let updated = client.update_post(post.id, &changes).await.into_data().unwrap();
        assert_eq!(updated.height.as_deref(), Some("1m"));

        let image = client
            .upload_image(post.id, "fruit.png", "image/png", b"\x89PNG")
            .await
            .into_data()
            .unwrap();
        let fetched = client.get_image(image.id).await.into_data().unwrap();
        assert_eq!(fetched.data, b"\x89PNG");
        assert_eq!(fetched.mime_type.as_deref(), Some("image/png"));
        assert_eq!(fetched.url, format!("/images?id={}", image.id));

        let posts = client.get_posts().await.into_data().unwrap();
        let image_ids: Vec<i64> = posts[0].images.iter().map(|i| i.id).collect();
        assert_eq!(image_ids, vec![image.id]);

        assert!(client.store().get_item(POSTS_STORAGE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_errors_surface_for_remote_only_calls() {
        let client = online_client().await;

        assert_eq!(
            client.update_post(999, &tomato()).await.error(),
            Some("Post not found: 999")
        );
        assert_eq!(client.get_image(999).await.error(), Some("Image not found"));
    }

    #[tokio::test]
    async fn test_unconfigured_server_create_falls_back_to_local() {
        let state = Arc::new(AppState::new(Config::default()));
        let client = HortaClient::new(InProcessTransport::new(state), MemoryStore::new());

        let post = client.create_post(&tomato()).await.into_data().unwrap();

        let stored = local::load_posts(client.store()).unwrap();
        assert_eq!(stored, vec![post]);
    }

    #[tokio::test]
    async fn test_token_restored_and_cleared() {
        let store = Arc::new(MemoryStore::new());
        store.set_item(TOKEN_STORAGE_KEY, "kept").unwrap();

        let mut client = HortaClient::new(OfflineTransport, Arc::clone(&store));
        assert_eq!(client.token(), Some("kept"));

        client.clear_token();
        assert!(!client.is_authenticated());
        assert!(store.get_item(TOKEN_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_outcome_envelope() {
        let ok = serde_json::to_value(Outcome::Success(vec![1, 2])).unwrap();
        assert_eq!(ok, json!({ "success": true, "data": [1, 2] }));

        let failed = serde_json::to_value(Outcome::<()>::failure("Network error")).unwrap();
        assert_eq!(failed, json!({ "success": false, "error": "Network error" }));
    }
}
