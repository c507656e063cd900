//! Images service
//!
//! Handles image uploads attached to posts. Image bytes live in the
//! database next to their post so the cascade removes them together.

use crate::config::MAX_FILENAME_LENGTH;
use crate::database::{Image, ImageSummary, NewImage, Repository};
use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Service for managing images
#[derive(Clone)]
pub struct ImagesService {
    repo: Option<Repository>,
}

impl ImagesService {
    pub fn new(repo: Option<Repository>) -> Self {
        Self { repo }
    }

    /// Create an image from a base64 payload.
    ///
    /// The payload may carry a `data:<mime>;base64,` prefix.
    pub async fn upload_image(
        &self,
        post_id: i64,
        filename: &str,
        mime_type: &str,
        image_data: &str,
    ) -> Result<ImageSummary> {
        let repo = self.repo.as_ref().ok_or(AppError::NotConfigured)?;

        let data = decode_image_data(image_data)?;

        tracing::info!(
            "Creating image: {} for post: {} (size: {} bytes)",
            filename,
            post_id,
            data.len()
        );

        if !repo.post_exists(post_id).await? {
            return Err(AppError::PostNotFound(post_id));
        }

        let image = NewImage {
            post_id,
            filename: sanitize_filename(filename),
            mime_type: mime_type.to_string(),
            data,
        };

        let summary = repo.create_image(&image).await?;

        tracing::info!("Image created: {}", summary.id);

        Ok(summary)
    }

    /// Get an image with its bytes. Unconfigured storage has no images.
    pub async fn get_image(&self, id: i64) -> Result<Option<Image>> {
        match &self.repo {
            Some(repo) => repo.get_image(id).await,
            None => Ok(None),
        }
    }
}

/// Decode a base64 image payload, with or without a data URL prefix
fn decode_image_data(image_data: &str) -> Result<Vec<u8>> {
    let encoded = match image_data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => image_data,
    };

    let data = STANDARD.decode(encoded.trim())?;
    if data.is_empty() {
        return Err(AppError::Validation("Image data is empty".to_string()));
    }

    Ok(data)
}

/// Sanitize filename to prevent path traversal attacks
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_FILENAME_LENGTH)
        .collect()
}
