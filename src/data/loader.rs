use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::datetime::{detect_format, parse_timestamp};
use crate::error::{AnalysisError, Result};
use crate::state::measurement::MeasurementSeries;

/// Name of the required time-index column.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Raw tabular input: column names and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub column_data: Vec<Vec<String>>, // column-major: column_data[col_idx][row_idx]
    pub row_count: usize,
}

impl RawTable {
    /// Build from row-major records. Short rows are padded with empty cells.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<String>]) -> Self {
        let mut column_data: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); columns.len()];
        for row in rows {
            for (col_idx, col_data) in column_data.iter_mut().enumerate() {
                col_data.push(row.get(col_idx).cloned().unwrap_or_default());
            }
        }
        Self {
            columns,
            column_data,
            row_count: rows.len(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name))
    }
}

/// One site's tabular source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub site_id: String,
    pub table: RawTable,
}

/// What to do with rows sharing a timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTimestamps {
    /// Keep only the last row (in original order) for each timestamp.
    #[default]
    LastWins,
    /// Keep every row, ties in original order.
    KeepAll,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Columns to coerce to numbers. `None` means every non-timestamp column.
    pub numeric_columns: Option<Vec<String>>,
    pub duplicates: DuplicateTimestamps,
}

/// Coerce one cell to a number. Empty, unparsable and non-finite cells are `None`.
pub fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a site's table into a time-ordered [`MeasurementSeries`].
///
/// Fails on the first timestamp that does not parse. Numeric cells that fail
/// coercion become missing values instead.
pub fn load_series(source: &SourceDescriptor, options: &LoadOptions) -> Result<MeasurementSeries> {
    let site_id = source.site_id.as_str();
    let table = &source.table;

    let ts_idx = table.column_index(TIMESTAMP_COLUMN).ok_or_else(|| {
        AnalysisError::MissingTimestampColumn {
            site_id: site_id.to_string(),
            column: TIMESTAMP_COLUMN.to_string(),
        }
    })?;
    let raw_ts = &table.column_data[ts_idx];

    let malformed = |row: usize| AnalysisError::MalformedTimestamp {
        site_id: site_id.to_string(),
        row,
        value: raw_ts[row].clone(),
    };

    let mut timestamps = Vec::with_capacity(table.row_count);
    if table.row_count > 0 {
        let format = detect_format(raw_ts).ok_or_else(|| malformed(0))?;
        for (row, cell) in raw_ts.iter().enumerate() {
            timestamps.push(parse_timestamp(cell, format).ok_or_else(|| malformed(row))?);
        }
    }

    let mut columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for (col_idx, name) in table.columns.iter().enumerate() {
        let name = name.trim();
        if col_idx == ts_idx || !is_declared(options, name) {
            continue;
        }
        if columns.iter().any(|(seen, _)| seen == name) {
            tracing::warn!("{site_id}: repeated column {name} ignored, first occurrence kept");
            continue;
        }
        let cells = &table.column_data[col_idx];
        let values: Vec<Option<f64>> = cells.iter().map(|c| coerce_numeric(c)).collect();

        let rejected = cells
            .iter()
            .zip(&values)
            .filter(|(c, v)| v.is_none() && !c.trim().is_empty())
            .count();
        if rejected > 0 {
            tracing::debug!("{site_id}: {rejected} non-numeric cells in {name} treated as missing");
        }
        columns.push((name.to_string(), values));
    }

    // Stable: equal timestamps keep their original row order.
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&i| timestamps[i]);

    if options.duplicates == DuplicateTimestamps::LastWins {
        let before = order.len();
        order = order
            .iter()
            .enumerate()
            .filter(|&(pos, &i)| {
                order
                    .get(pos + 1)
                    .map_or(true, |&next| timestamps[next] != timestamps[i])
            })
            .map(|(_, &i)| i)
            .collect();
        if order.len() < before {
            tracing::debug!("{site_id}: collapsed {} duplicate timestamps", before - order.len());
        }
    }

    let sorted_ts = order.iter().map(|&i| timestamps[i]).collect();
    let variables: BTreeMap<String, Vec<Option<f64>>> = columns
        .into_iter()
        .map(|(name, values)| (name, order.iter().map(|&i| values[i]).collect()))
        .collect();

    tracing::info!(
        "Loaded {} rows, {} variables for site {site_id}",
        order.len(),
        variables.len()
    );
    MeasurementSeries::new(site_id, sorted_ts, variables)
}

fn is_declared(options: &LoadOptions, name: &str) -> bool {
    match &options.numeric_columns {
        Some(declared) => declared.iter().any(|d| d == name),
        None => true,
    }
}
