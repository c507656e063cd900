//! Posts service
//!
//! High-level business logic for diary posts.
//!
//! Without a configured database, reads degrade to an empty result while
//! writes fail with `AppError::NotConfigured`. A browsing client renders an
//! empty diary; a client trying to save gets a clear failure.

use crate::database::{Post, PostFields, Repository};
use crate::error::{AppError, Result};

/// Service for managing posts
#[derive(Clone)]
pub struct PostsService {
    repo: Option<Repository>,
}

impl PostsService {
    pub fn new(repo: Option<Repository>) -> Self {
        Self { repo }
    }

    fn writable(&self) -> Result<&Repository> {
        self.repo.as_ref().ok_or(AppError::NotConfigured)
    }

    /// List all posts with their images, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        match &self.repo {
            Some(repo) => repo.list_posts().await,
            None => {
                tracing::debug!("No database configured, listing no posts");
                Ok(Vec::new())
            }
        }
    }

    /// Create a new post
    pub async fn create_post(&self, fields: &PostFields) -> Result<Post> {
        let repo = self.writable()?;

        tracing::info!(
            "Creating new post: {}",
            fields.plant_type.as_deref().unwrap_or("<untitled>")
        );

        let post = repo.create_post(fields).await?;

        tracing::info!("Post created successfully: {}", post.id);

        Ok(post)
    }

    /// Update the provided fields of a post
    pub async fn update_post(&self, id: i64, fields: &PostFields) -> Result<Post> {
        let repo = self.writable()?;

        tracing::debug!("Updating post: {}", id);

        let post = repo.update_post(id, fields).await?;

        tracing::debug!("Post updated successfully: {}", post.id);

        Ok(post)
    }

    /// Delete a post and, through the cascade, its images.
    ///
    /// Deleting an id that matches nothing is not an error.
    pub async fn delete_post(&self, id: i64) -> Result<()> {
        let repo = self.writable()?;

        tracing::info!("Deleting post: {}", id);

        let rows = repo.delete_post(id).await?;
        if rows == 0 {
            tracing::debug!("Delete matched no post: {}", id);
        }

        Ok(())
    }
}
