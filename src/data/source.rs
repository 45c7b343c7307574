use std::path::Path;

use crate::data::loader::{self, LoadOptions, RawTable, SourceDescriptor};
use crate::error::{AnalysisError, Result};
use crate::state::measurement::MeasurementSeries;

/// Read a CSV or Excel file whose first row is the header.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "csv" => read_csv_rows(path)?,
        "xls" | "xlsx" => read_excel_rows(path)?,
        _ => return Err(AnalysisError::UnsupportedFormat(ext)),
    };

    let mut rows = rows.into_iter();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| AnalysisError::EmptySource(path.to_path_buf()))?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    let data_rows: Vec<Vec<String>> = rows.collect();

    tracing::debug!("Read {} rows x {} columns from {:?}", data_rows.len(), columns.len(), path);
    Ok(RawTable::from_rows(columns, &data_rows))
}

/// Read and load one site's file.
pub fn load_site(site_id: &str, path: &Path, options: &LoadOptions) -> Result<MeasurementSeries> {
    let source = SourceDescriptor {
        site_id: site_id.to_string(),
        table: read_table(path)?,
    };
    loader::load_series(&source, options)
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    // UTF-8 first, latin1 fallback (each byte maps to the same code point).
    let content = std::fs::read(path)?;
    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(e) => e.as_bytes().iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

fn read_excel_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnalysisError::EmptySource(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty | Data::Error(_) => String::new(),
                    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
                    Data::Float(f) => f.to_string(),
                    Data::Int(i) => i.to_string(),
                    Data::Bool(b) => b.to_string(),
                    Data::DateTime(dt) => match dt.as_datetime() {
                        Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
                        None => dt.to_string(),
                    },
                })
                .collect()
        })
        .collect();
    Ok(rows)
}
