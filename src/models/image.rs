//! Image DTOs.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::annotation::{AnnotationCreate, AnnotationRead};
use crate::entity::{annotation, image};
use crate::error::{AppError, AppResult};

/// Longest accepted image key.
pub const MAX_IMAGE_KEY_LEN: usize = 255;

/// Intended use of an image in the ML pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MlTag {
    Train,
    Test,
    Live,
}

impl MlTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "TRAIN",
            Self::Test => "TEST",
            Self::Live => "LIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRAIN" => Some(Self::Train),
            "TEST" => Some(Self::Test),
            "LIVE" => Some(Self::Live),
            _ => None,
        }
    }
}

impl std::fmt::Display for MlTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to create an image, optionally with its first annotations.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImageCreate {
    /// Catalog key. May be left empty on multipart uploads to use the file name.
    #[serde(default)]
    pub image_key: String,
    pub client_id: String,
    /// RFC 3339 timestamp; naive timestamps are taken as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub hardware_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_ml_tag")]
    pub ml_tag: Option<MlTag>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub location_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationCreate>,
}

impl ImageCreate {
    pub fn validate(&self) -> AppResult<()> {
        if self.image_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "image_key must not be empty".to_string(),
            ));
        }
        if self.image_key.len() > MAX_IMAGE_KEY_LEN {
            return Err(AppError::InvalidInput(format!(
                "image_key must be at most {} bytes",
                MAX_IMAGE_KEY_LEN
            )));
        }
        if self.client_id.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "client_id must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.annotations.len());
        for annotation in &self.annotations {
            if !seen.insert(annotation.index) {
                return Err(AppError::InvalidInput(format!(
                    "duplicate annotation index {}",
                    annotation.index
                )));
            }
            annotation.validate()?;
        }

        Ok(())
    }
}

/// Image with its annotations, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageRead {
    pub image_key: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    pub hardware_id: Option<String>,
    pub ml_tag: Option<MlTag>,
    pub location_id: Option<String>,
    pub user_id: Option<String>,
    /// Whether an image file is stored for this key.
    pub has_file: bool,
    pub annotations: Vec<AnnotationRead>,
}

impl ImageRead {
    pub fn from_entity(model: image::Model, annotations: Vec<annotation::Model>) -> Self {
        Self {
            ml_tag: model.ml_tag.as_deref().and_then(MlTag::parse),
            has_file: model.file_name.is_some(),
            image_key: model.image_key,
            client_id: model.client_id,
            created_at: model.created_at,
            hardware_id: model.hardware_id,
            location_id: model.location_id,
            user_id: model.user_id,
            annotations: annotations
                .into_iter()
                .map(AnnotationRead::from_entity)
                .collect(),
        }
    }
}

/// Confirmation returned after deleting an image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteImageResponse {
    pub image_key: String,
    pub annotations_deleted: u64,
    pub message: String,
}

/// Parse an RFC 3339 timestamp, falling back to naive ISO 8601 forms read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// Empty strings from form-built payloads mean "not provided".
fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn deserialize_optional_ml_tag<'de, D>(deserializer: D) -> Result<Option<MlTag>, D::Error>
where
    D: Deserializer<'de>,
{
    match deserialize_optional_string(deserializer)? {
        None => Ok(None),
        Some(raw) => MlTag::parse(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unsupported ml_tag '{}', expected TRAIN, TEST or LIVE",
                raw
            ))
        }),
    }
}
