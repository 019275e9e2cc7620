//! Image file transform parameters.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_QUALITY: u8 = 75;

/// Query parameters of the `/images/{image_key}/file` endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransformQuery {
    /// Scaling factor, greater than zero (default 1.0).
    pub scale: Option<f64>,
    /// JPEG quality from 1 to 100 (default 75). Ignored for other formats.
    pub quality: Option<i64>,
}

/// Validated transform parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub scale: f64,
    pub quality: u8,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl TransformQuery {
    pub fn into_params(self) -> AppResult<TransformParams> {
        let scale = self.scale.unwrap_or(DEFAULT_SCALE);
        if !scale.is_finite() || scale <= 0.0 {
            return Err(AppError::InvalidInput(
                "scale must be a number greater than 0".to_string(),
            ));
        }

        let quality = self.quality.unwrap_or(DEFAULT_QUALITY as i64);
        if !(1..=100).contains(&quality) {
            return Err(AppError::InvalidInput(
                "quality must be between 1 and 100".to_string(),
            ));
        }

        Ok(TransformParams {
            scale,
            quality: quality as u8,
        })
    }
}
