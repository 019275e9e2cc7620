//! Annotation DTOs and the polygon shape.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;
use utoipa::ToSchema;

use crate::entity::annotation;
use crate::error::{AppError, AppResult};

/// Ordered outline of an annotated region, in image pixel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Polygon {
    /// Vertices as `[x, y]` pairs, in drawing order.
    #[schema(value_type = Vec<Vec<f64>>)]
    pub points: Vec<[f64; 2]>,
}

impl Polygon {
    /// Reject non-finite coordinates.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(pos) = self
            .points
            .iter()
            .position(|[x, y]| !x.is_finite() || !y.is_finite())
        {
            return Err(AppError::InvalidInput(format!(
                "polygon point {} has a non-finite coordinate",
                pos
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({ "points": self.points })
    }

    /// Read a stored polygon. `null` yields an empty one; so does a
    /// malformed value, with a warning.
    pub fn from_json(value: &JsonValue) -> Self {
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!("Stored polygon is malformed, serving it as empty: {}", e);
            Self::default()
        })
    }
}

/// Request to create an annotation, standalone or inline with a new image.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnnotationCreate {
    /// Index, unique within the image.
    pub index: i32,
    /// Instrument label of the region.
    pub instrument: String,
    #[serde(default)]
    pub polygon: Polygon,
}

impl AnnotationCreate {
    pub fn validate(&self) -> AppResult<()> {
        validate_instrument(&self.instrument)?;
        self.polygon.validate()
    }
}

/// Request to replace an annotation's label and outline.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnnotationUpdate {
    /// Optional echo of the path index; must match when present.
    #[serde(default)]
    pub index: Option<i32>,
    pub instrument: String,
    #[serde(default)]
    pub polygon: Polygon,
}

impl AnnotationUpdate {
    pub fn validate(&self, path_index: i32) -> AppResult<()> {
        if let Some(index) = self.index
            && index != path_index
        {
            return Err(AppError::InvalidInput(format!(
                "index is immutable (path has {}, body has {})",
                path_index, index
            )));
        }
        validate_instrument(&self.instrument)?;
        self.polygon.validate()
    }
}

fn validate_instrument(instrument: &str) -> AppResult<()> {
    if instrument.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "instrument must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Annotation as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnnotationRead {
    pub image_key: String,
    pub index: i32,
    pub instrument: String,
    pub polygon: Polygon,
}

impl AnnotationRead {
    pub fn from_entity(model: annotation::Model) -> Self {
        Self {
            polygon: Polygon::from_json(&model.polygon),
            image_key: model.image_key,
            index: model.index,
            instrument: model.instrument,
        }
    }
}
