//! Database models
//!
//! Rust structs representing database entities.
//! Rows are serialized with snake_case keys, the shape the handlers
//! return and the shape the client keeps in local storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Writable post columns, in table order.
///
/// Identifier, author and timestamps are assigned by the store and never
/// accepted from a request body.
pub const POST_COLUMNS: [&str; 11] = [
    "plant_type",
    "plant_age",
    "planting_date",
    "height",
    "weather",
    "temperature",
    "watering",
    "fertilizer",
    "pest_problems",
    "notes",
    "expected_harvest",
];

/// A gardening diary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub plant_type: Option<String>,
    #[serde(default)]
    pub plant_age: Option<String>,
    #[serde(default)]
    pub planting_date: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub watering: Option<String>,
    #[serde(default)]
    pub fertilizer: Option<String>,
    #[serde(default)]
    pub pest_problems: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_harvest: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<ImageSummary>,
}

impl Post {
    /// Editable fields of this post
    pub fn fields(&self) -> PostFields {
        PostFields {
            plant_type: self.plant_type.clone(),
            plant_age: self.plant_age.clone(),
            planting_date: self.planting_date.clone(),
            height: self.height.clone(),
            weather: self.weather.clone(),
            temperature: self.temperature.clone(),
            watering: self.watering.clone(),
            fertilizer: self.fertilizer.clone(),
            pest_problems: self.pest_problems.clone(),
            notes: self.notes.clone(),
            expected_harvest: self.expected_harvest.clone(),
        }
    }
}

/// Post row as read from the database, images aggregated as JSON text
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub plant_type: Option<String>,
    pub plant_age: Option<String>,
    pub planting_date: Option<String>,
    pub height: Option<String>,
    pub weather: Option<String>,
    pub temperature: Option<String>,
    pub watering: Option<String>,
    pub fertilizer: Option<String>,
    pub pest_problems: Option<String>,
    pub notes: Option<String>,
    pub expected_harvest: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub images: String,
}

impl TryFrom<PostRow> for Post {
    type Error = serde_json::Error;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let mut images: Vec<ImageSummary> = serde_json::from_str(&row.images)?;
        images.sort_by_key(|image| image.id);

        Ok(Post {
            id: row.id,
            plant_type: row.plant_type,
            plant_age: row.plant_age,
            planting_date: row.planting_date,
            height: row.height,
            weather: row.weather,
            temperature: row.temperature,
            watering: row.watering,
            fertilizer: row.fertilizer,
            pest_problems: row.pest_problems,
            notes: row.notes,
            expected_harvest: row.expected_harvest,
            author: row.author,
            created_at: row.created_at,
            updated_at: row.updated_at,
            images,
        })
    }
}

/// Editable post fields.
///
/// Serialized with camelCase keys, which is what the client sends. The
/// server resolves incoming bodies through the alias table in
/// `functions::aliases` instead of deserializing this type directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watering: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fertilizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pest_problems: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_harvest: Option<String>,
}

impl PostFields {
    /// Value of a column by its snake_case name
    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            "plant_type" => &self.plant_type,
            "plant_age" => &self.plant_age,
            "planting_date" => &self.planting_date,
            "height" => &self.height,
            "weather" => &self.weather,
            "temperature" => &self.temperature,
            "watering" => &self.watering,
            "fertilizer" => &self.fertilizer,
            "pest_problems" => &self.pest_problems,
            "notes" => &self.notes,
            "expected_harvest" => &self.expected_harvest,
            _ => return None,
        };
        value.as_deref()
    }

    /// Set a column by its snake_case name. Unknown columns are ignored.
    pub fn set(&mut self, column: &str, value: String) {
        let slot = match column {
            "plant_type" => &mut self.plant_type,
            "plant_age" => &mut self.plant_age,
            "planting_date" => &mut self.planting_date,
            "height" => &mut self.height,
            "weather" => &mut self.weather,
            "temperature" => &mut self.temperature,
            "watering" => &mut self.watering,
            "fertilizer" => &mut self.fertilizer,
            "pest_problems" => &mut self.pest_problems,
            "notes" => &mut self.notes,
            "expected_harvest" => &mut self.expected_harvest,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Columns that carry a value, in table order
    pub fn provided(&self) -> Vec<(&'static str, &str)> {
        POST_COLUMNS
            .iter()
            .filter_map(|column| self.get(column).map(|value| (*column, value)))
            .collect()
    }
}

/// Image metadata as embedded in a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ImageSummary {
    pub id: i64,
    pub post_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

/// Image with its raw bytes
#[derive(Debug, Clone, FromRow)]
pub struct Image {
    pub id: i64,
    pub post_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Create image request
#[derive(Debug)]
pub struct NewImage {
    pub post_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Authenticated identity returned by the auth paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
}
