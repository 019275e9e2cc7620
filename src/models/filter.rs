//! Image listing filters.
//!
//! Each filter is a set of ids; an image matches a filter when its value is
//! in the set. Filters combine with AND, and an empty set means "no filter".

use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

/// Parsed `GET /images` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageFilter {
    /// Keep images owned by any of these users.
    pub user_ids: Vec<String>,
    /// Keep images taken at any of these locations.
    pub location_ids: Vec<String>,
    /// Keep images with at least one annotation of any of these instruments.
    pub instrument_ids: Vec<String>,
}

impl ImageFilter {
    /// Parse a raw query string.
    ///
    /// Repeated keys (`user_ids=a&user_ids=b`) and the bracket form
    /// (`user_ids[]=a`) are both accepted. Unknown keys are ignored.
    pub fn from_query_str(query: &str) -> AppResult<Self> {
        let mut filter = Self::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(raw_key)?;
            let value = decode_component(raw_value)?;

            let target = match key.trim_end_matches("[]") {
                "user_ids" => &mut filter.user_ids,
                "location_ids" => &mut filter.location_ids,
                "instrument_ids" => &mut filter.instrument_ids,
                _ => continue,
            };

            if !value.is_empty() && !target.contains(&value) {
                target.push(value);
            }
        }

        Ok(filter)
    }
}

fn decode_component(raw: &str) -> AppResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| AppError::InvalidInput(format!("Invalid query encoding: {}", e)))
}
