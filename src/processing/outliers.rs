use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Stat, Undefined};
use crate::processing::statistics::{is_zero_spread, mean, std_dev};
use crate::state::measurement::MeasurementSeries;

/// Z-score outlier detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreConfig {
    /// |z| above this is flagged (default: 3.0).
    pub threshold: f64,
    /// Delta degrees of freedom of the standard deviation (default: 0).
    pub ddof: usize,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            ddof: 0,
        }
    }
}

impl ZScoreConfig {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

/// Z-scores of one variable, positionally aligned with the source series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZScoreColumn {
    pub mean: Stat,
    pub std_dev: Stat,
    /// `None` where the source reading is missing.
    pub scores: Vec<Option<Stat>>,
    pub is_outlier: Vec<bool>,
}

impl ZScoreColumn {
    pub fn outlier_count(&self) -> usize {
        self.is_outlier.iter().filter(|&&o| o).count()
    }

    pub fn outlier_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_outlier
            .iter()
            .enumerate()
            .filter_map(|(i, &o)| o.then_some(i))
    }
}

/// Per-variable z-scores and outlier flags. Source data is never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZScoreTable {
    pub site_id: String,
    pub threshold: f64,
    pub columns: BTreeMap<String, ZScoreColumn>,
}

impl ZScoreTable {
    pub fn get(&self, variable: &str) -> Option<&ZScoreColumn> {
        self.columns.get(variable)
    }

    /// Rows flagged in any variable.
    pub fn outlier_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .columns
            .values()
            .flat_map(|c| c.outlier_indices())
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}

/// Score one column. Each variable is standardized on its own valid values.
pub fn zscore_column(values: &[Option<f64>], config: &ZScoreConfig) -> ZScoreColumn {
    let valid: Vec<f64> = values.iter().flatten().copied().collect();

    let spread = mean(&valid).and_then(|m| {
        let sd = std_dev(&valid, config.ddof)?;
        if is_zero_spread(&valid, sd) {
            Err(Undefined::ZeroVariance)
        } else {
            Ok((m, sd))
        }
    });

    let scores: Vec<Option<Stat>> = values
        .iter()
        .map(|v| {
            v.map(|x| match spread {
                Ok((m, sd)) => Stat::Value((x - m) / sd),
                Err(u) => Stat::Undefined(u),
            })
        })
        .collect();

    let is_outlier = scores
        .iter()
        .map(|s| matches!(s, Some(Stat::Value(z)) if z.abs() > config.threshold))
        .collect();

    ZScoreColumn {
        mean: mean(&valid).into(),
        std_dev: std_dev(&valid, config.ddof).into(),
        scores,
        is_outlier,
    }
}

/// Compute z-scores for each of `variables`. Absent variables score as all-missing.
pub fn detect(series: &MeasurementSeries, variables: &[String], config: &ZScoreConfig) -> ZScoreTable {
    let columns: BTreeMap<String, ZScoreColumn> = variables
        .iter()
        .map(|name| {
            let column = match series.variable(name) {
                Some(values) => zscore_column(values, config),
                None => zscore_column(&series.values_or_missing(name), config),
            };
            (name.clone(), column)
        })
        .collect();

    let flagged: usize = columns.values().map(|c| c.outlier_count()).sum();
    tracing::debug!(
        "Site {}: {flagged} outliers at |z| > {}",
        series.site_id(),
        config.threshold
    );

    ZScoreTable {
        site_id: series.site_id().to_string(),
        threshold: config.threshold,
        columns,
    }
}
