use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Structural failures that abort an operation.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Malformed timestamp for site {site_id} at row {row}: {value:?}")]
    MalformedTimestamp {
        site_id: String,
        row: usize,
        value: String,
    },

    #[error("Site {site_id} has no {column:?} column")]
    MissingTimestampColumn { site_id: String, column: String },

    #[error("Duplicate site id: {0}")]
    DuplicateSiteId(String),

    #[error("Variable {variable} of site {site_id} has {actual} values, expected {expected}")]
    LengthMismatch {
        site_id: String,
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("Timestamps of site {site_id} decrease at index {index}")]
    UnsortedTimestamps { site_id: String, index: usize },

    #[error("Unsupported file format: .{0}")]
    UnsupportedFormat(String),

    #[error("No data found in {0}")]
    EmptySource(PathBuf),

    #[error("Cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Why a statistic could not be computed. Carried in output data, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Undefined {
    #[error("no valid values")]
    EmptyValidSample,

    #[error("fewer than two valid values")]
    TooFewValues,

    #[error("zero variance")]
    ZeroVariance,
}

/// A computed statistic, or the reason it is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Value(f64),
    Undefined(Undefined),
}

impl Stat {
    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(v) => Some(*v),
            Stat::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Stat::Value(_))
    }
}

impl From<std::result::Result<f64, Undefined>> for Stat {
    fn from(r: std::result::Result<f64, Undefined>) -> Self {
        match r {
            Ok(v) => Stat::Value(v),
            Err(u) => Stat::Undefined(u),
        }
    }
}
