use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::processing::correlation::{correlate, CorrelationMatrix};
use crate::processing::outliers::{detect, ZScoreTable};
use crate::processing::resample::{resample, resample_collection, ResampledSeries, SiteResample};
use crate::processing::statistics::{describe, missing_counts, Summary};
use crate::state::collection::{SiteCollection, COMBINED_SITE_ID};
use crate::state::measurement::MeasurementSeries;

/// Row-level statistics of one series: a site, or all sites merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStatistics {
    pub rows: usize,
    pub summary: BTreeMap<String, Summary>,
    pub missing: BTreeMap<String, usize>,
    pub correlation: CorrelationMatrix,
    pub zscores: ZScoreTable,
}

/// Everything computed for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteReport {
    pub site_id: String,
    #[serde(flatten)]
    pub stats: SeriesStatistics,
    pub resampled: ResampledSeries,
}

/// The all-sites view. Row statistics run over the merged series; resampling
/// stays per site, keyed by `(site_id, bucket)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedReport {
    pub site_id: String,
    #[serde(flatten)]
    pub stats: SeriesStatistics,
    pub resampled: SiteResample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub sites: BTreeMap<String, SiteReport>,
    /// Present when `config.combined` is set.
    pub combined: Option<CombinedReport>,
}

fn series_statistics(series: &MeasurementSeries, config: &AnalysisConfig) -> SeriesStatistics {
    let summary_vars: Vec<String> = config
        .variables
        .iter()
        .chain(&config.correlation_variables)
        .fold(Vec::new(), |mut acc, v| {
            if !acc.contains(v) {
                acc.push(v.clone());
            }
            acc
        });

    SeriesStatistics {
        rows: series.len(),
        summary: describe(series, &summary_vars),
        missing: missing_counts(series),
        correlation: correlate(series, &config.correlation_variables),
        zscores: detect(series, &config.variables, &config.zscore()),
    }
}

/// Run every analysis over one series.
pub fn analyze_series(series: &MeasurementSeries, config: &AnalysisConfig) -> Result<SiteReport> {
    Ok(SiteReport {
        site_id: series.site_id().to_string(),
        stats: series_statistics(series, config),
        resampled: resample(series, config.period, &config.variables)?,
    })
}

/// Run the analysis for every site of the collection. A single site is just a
/// one-entry collection.
pub fn analyze(sites: &SiteCollection, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let mut reports = BTreeMap::new();
    for (id, series) in sites.iter() {
        reports.insert(id.to_string(), analyze_series(series, config)?);
    }

    let combined = if config.combined && !sites.is_empty() {
        let merged = sites.merged()?;
        tracing::info!("Analysing {} sites as {COMBINED_SITE_ID}", sites.len());
        Some(CombinedReport {
            site_id: COMBINED_SITE_ID.to_string(),
            stats: series_statistics(&merged, config),
            resampled: resample_collection(sites, config.period, &config.variables)?,
        })
    } else {
        None
    };

    tracing::info!("Analysis complete for {} sites", reports.len());
    Ok(AnalysisReport {
        sites: reports,
        combined,
    })
}
