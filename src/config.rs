use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::loader::{DuplicateTimestamps, LoadOptions};
use crate::error::Result;
use crate::processing::outliers::ZScoreConfig;
use crate::processing::resample::Period;
use crate::state::measurement::PHYSICAL_VARIABLES;

/// Variables scored for outliers and resampled by default.
pub const DEFAULT_ZSCORE_VARIABLES: [&str; 8] =
    ["GHI", "DNI", "DHI", "TModA", "TModB", "WS", "WSgust", "WD"];

/// Settings for one analysis run. Every field has a default, so `{}` is a
/// valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub variables: Vec<String>,
    pub correlation_variables: Vec<String>,
    pub period: Period,
    pub zscore_threshold: f64,
    pub zscore_ddof: usize,
    /// Columns to read as numbers; `None` reads every non-timestamp column.
    pub numeric_columns: Option<Vec<String>>,
    pub duplicate_timestamps: DuplicateTimestamps,
    /// Also analyse all sites merged into one series.
    pub combined: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            variables: DEFAULT_ZSCORE_VARIABLES.iter().map(|s| s.to_string()).collect(),
            correlation_variables: PHYSICAL_VARIABLES.iter().map(|s| s.to_string()).collect(),
            period: Period::default(),
            zscore_threshold: ZScoreConfig::default().threshold,
            zscore_ddof: ZScoreConfig::default().ddof,
            numeric_columns: None,
            duplicate_timestamps: DuplicateTimestamps::default(),
            combined: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn zscore(&self) -> ZScoreConfig {
        ZScoreConfig {
            threshold: self.zscore_threshold,
            ddof: self.zscore_ddof,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            numeric_columns: self.numeric_columns.clone(),
            duplicates: self.duplicate_timestamps,
        }
    }
}
