//! Repository layer for database operations
//!
//! This module provides CRUD operations for posts and images.
//! Every statement is parameterized; column names only ever come from
//! the static `POST_COLUMNS` list.

use super::models::*;
use crate::config::POST_AUTHOR;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;

/// Posts joined with their images, aggregated into a JSON array per post.
const SELECT_POSTS_WITH_IMAGES: &str = r#"
    SELECT
        p.id, p.plant_type, p.plant_age, p.planting_date, p.height, p.weather,
        p.temperature, p.watering, p.fertilizer, p.pest_problems, p.notes,
        p.expected_harvest, p.author, p.created_at, p.updated_at,
        COALESCE(
            json_group_array(
                json_object(
                    'id', i.id,
                    'post_id', i.post_id,
                    'filename', i.filename,
                    'mime_type', i.mime_type,
                    'created_at', i.created_at
                )
            ) FILTER (WHERE i.id IS NOT NULL),
            '[]'
        ) AS images
    FROM posts p
    LEFT JOIN images i ON i.post_id = p.id
"#;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub async fn create_post(&self, fields: &PostFields) -> Result<Post> {
        let now = Utc::now();

        let columns = POST_COLUMNS.join(", ");
        let placeholders = vec!["?"; POST_COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO posts ({}, author, created_at) VALUES ({}, ?, ?)",
            columns, placeholders
        );

        let mut query = sqlx::query(&sql);
        for column in POST_COLUMNS {
            query = query.bind(fields.get(column));
        }

        let id = query
            .bind(POST_AUTHOR)
            .bind(now)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        tracing::debug!("Created post: {}", id);
        self.get_post(id).await
    }

    /// Get a post with its images
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        let sql = format!("{} WHERE p.id = ? GROUP BY p.id", SELECT_POSTS_WITH_IMAGES);

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::PostNotFound(id))?;

        Ok(Post::try_from(row)?)
    }

    /// List all posts, newest first
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let sql = format!(
            "{} GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC",
            SELECT_POSTS_WITH_IMAGES
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let posts = rows
            .into_iter()
            .map(Post::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    /// Update the provided fields of a post and refresh `updated_at`
    pub async fn update_post(&self, id: i64, fields: &PostFields) -> Result<Post> {
        let now = Utc::now();

        // Build dynamic update query
        let mut sql = "UPDATE posts SET updated_at = ?".to_string();
        let provided = fields.provided();
        for (column, _) in &provided {
            sql.push_str(&format!(", {} = ?", column));
        }
        sql.push_str(" WHERE id = ?");

        let mut query = sqlx::query(&sql).bind(now);
        for (_, value) in &provided {
            query = query.bind(*value);
        }

        let rows_affected = query.bind(id).execute(&self.pool).await?.rows_affected();

        if rows_affected == 0 {
            return Err(AppError::PostNotFound(id));
        }

        tracing::debug!("Updated post: {} ({} fields)", id, provided.len());
        self.get_post(id).await
    }

    /// Delete a post. Its images go with it through the foreign key cascade.
    ///
    /// Returns the number of rows removed.
    pub async fn delete_post(&self, id: i64) -> Result<u64> {
        let rows = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted post: {} (rows: {})", id, rows);
        Ok(rows)
    }

    /// Check whether a post exists
    pub async fn post_exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Create an image attached to a post
    pub async fn create_image(&self, image: &NewImage) -> Result<ImageSummary> {
        let now = Utc::now();

        let summary = sqlx::query_as::<_, ImageSummary>(
            r#"
            INSERT INTO images (post_id, filename, mime_type, data, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, post_id, filename, mime_type, created_at
            "#,
        )
        .bind(image.post_id)
        .bind(&image.filename)
        .bind(&image.mime_type)
        .bind(&image.data)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Created image: {} for post: {} ({} bytes)",
            summary.id,
            image.post_id,
            image.data.len()
        );
        Ok(summary)
    }

    /// Get an image with its bytes
    pub async fn get_image(&self, id: i64) -> Result<Option<Image>> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, post_id, filename, mime_type, data, created_at
            FROM images WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }
}
