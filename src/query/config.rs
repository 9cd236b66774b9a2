//! Translator configuration
//!
//! Defaults match the public parameter contract: 15 rows per page, at most
//! 100, a 10 km proximity radius, and `created_at` as the time-range column.

use serde::{Deserialize, Serialize};

/// Knobs that shape how parameters become a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Page size when `per_page` is absent (default: 15)
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    /// Upper clamp for `per_page` (default: 100)
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,

    /// Radius when `near[distance]` is absent (default: 10 km)
    #[serde(default = "default_distance_km")]
    pub default_distance_km: f64,

    /// Column constrained by `start_date` / `end_date` (default: "created_at")
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Row latitude column for `near` (default: "latitude")
    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,

    /// Row longitude column for `near` (default: "longitude")
    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,

    /// Reject references to columns the entity does not declare (default: true)
    #[serde(default = "default_strict_columns")]
    pub strict_columns: bool,
}

fn default_per_page() -> u32 {
    15
}

fn default_max_per_page() -> u32 {
    100
}

fn default_distance_km() -> f64 {
    10.0
}

fn default_timestamp_column() -> String {
    "created_at".to_string()
}

fn default_latitude_column() -> String {
    "latitude".to_string()
}

fn default_longitude_column() -> String {
    "longitude".to_string()
}

fn default_strict_columns() -> bool {
    true
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            default_distance_km: default_distance_km(),
            timestamp_column: default_timestamp_column(),
            latitude_column: default_latitude_column(),
            longitude_column: default_longitude_column(),
            strict_columns: default_strict_columns(),
        }
    }
}

impl TranslatorConfig {
    /// Checks internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_per_page == 0 {
            return Err("max_per_page must be > 0".to_string());
        }
        if self.default_per_page == 0 || self.default_per_page > self.max_per_page {
            return Err(format!(
                "default_per_page must be within [1, {}]",
                self.max_per_page
            ));
        }
        if !self.default_distance_km.is_finite() || self.default_distance_km < 0.0 {
            return Err("default_distance_km must be a non-negative number".to_string());
        }
        for (name, column) in [
            ("timestamp_column", &self.timestamp_column),
            ("latitude_column", &self.latitude_column),
            ("longitude_column", &self.longitude_column),
        ] {
            if !super::identifier::is_column_name(column) {
                return Err(format!("{} '{}' is not a valid column name", name, column));
            }
        }
        Ok(())
    }
}
