//! Field alias resolution for post bodies
//!
//! Clients send post fields either camelCase (`plantType`) or snake_case
//! (`plant_type`). The table below is applied once, at the handler
//! boundary; everything past it works with `PostFields`. When both
//! spellings are present the camelCase one wins.

use crate::database::PostFields;
use serde_json::{Map, Value};

/// The two accepted spellings of one post column
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    /// snake_case spelling, also the column name
    pub column: &'static str,
    pub camel: &'static str,
}

const fn alias(column: &'static str, camel: &'static str) -> FieldAlias {
    FieldAlias { column, camel }
}

pub const POST_FIELD_ALIASES: [FieldAlias; 11] = [
    alias("plant_type", "plantType"),
    alias("plant_age", "plantAge"),
    alias("planting_date", "plantingDate"),
    alias("height", "height"),
    alias("weather", "weather"),
    alias("temperature", "temperature"),
    alias("watering", "watering"),
    alias("fertilizer", "fertilizer"),
    alias("pest_problems", "pestProblems"),
    alias("notes", "notes"),
    alias("expected_harvest", "expectedHarvest"),
];

/// Text form of a scalar JSON value. Null, arrays and objects have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve a request body into post fields
pub fn resolve_post_fields(body: &Map<String, Value>) -> PostFields {
    let mut fields = PostFields::default();

    for alias in &POST_FIELD_ALIASES {
        let value = body
            .get(alias.camel)
            .and_then(scalar_text)
            .or_else(|| body.get(alias.column).and_then(scalar_text));

        if let Some(value) = value {
            fields.set(alias.column, value);
        }
    }

    fields
}
