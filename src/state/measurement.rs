use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AnalysisError, Result};

/// Physical variables reported by the irradiance stations.
pub const PHYSICAL_VARIABLES: [&str; 11] = [
    "GHI", "DNI", "DHI", "TModA", "TModB", "WS", "WSgust", "WD", "RH", "Tamb", "BP",
];

/// One site's time-ordered readings.
///
/// Every variable column is positionally aligned with `timestamps`; a missing
/// reading is `None`, never a dropped row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSeries {
    site_id: String,
    timestamps: Vec<NaiveDateTime>,
    variables: BTreeMap<String, Vec<Option<f64>>>,
}

impl MeasurementSeries {
    /// Build a series, checking column lengths and that time never goes backwards.
    pub fn new(
        site_id: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        variables: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        let site_id = site_id.into();

        for (name, values) in &variables {
            if values.len() != timestamps.len() {
                return Err(AnalysisError::LengthMismatch {
                    site_id,
                    variable: name.clone(),
                    expected: timestamps.len(),
                    actual: values.len(),
                });
            }
        }

        if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(AnalysisError::UnsortedTimestamps { site_id, index: i + 1 });
        }

        Ok(Self {
            site_id,
            timestamps,
            variables,
        })
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|k| k.as_str())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&[Option<f64>]> {
        self.variables.get(name).map(|v| v.as_slice())
    }

    pub fn variables(&self) -> &BTreeMap<String, Vec<Option<f64>>> {
        &self.variables
    }

    /// Values of `name`, or an all-`None` column when the site does not report it.
    pub fn values_or_missing(&self, name: &str) -> Vec<Option<f64>> {
        match self.variables.get(name) {
            Some(values) => values.clone(),
            None => vec![None; self.len()],
        }
    }

    /// Iterate the valid (present) readings of `name`.
    pub fn valid_values<'a>(&'a self, name: &str) -> impl Iterator<Item = f64> + 'a {
        self.variables
            .get(name)
            .into_iter()
            .flat_map(|values| values.iter().flatten().copied())
    }
}
