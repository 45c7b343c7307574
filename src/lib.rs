//! Statistical analysis of multi-site solar irradiance sensor data.
//!
//! Loads per-site time series, then computes periodic means, correlation
//! matrices and z-score outlier flags over them. Rendering is left to the
//! caller; every output is a plain serializable value.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod state;

pub use config::AnalysisConfig;
pub use data::loader::{load_series, LoadOptions, RawTable, SourceDescriptor};
pub use error::{AnalysisError, Result, Stat, Undefined};
pub use pipeline::{analyze, AnalysisReport, CombinedReport, SeriesStatistics, SiteReport};
pub use processing::correlation::{correlate, CorrelationMatrix};
pub use processing::outliers::{detect, ZScoreConfig, ZScoreTable};
pub use processing::resample::{
    resample, resample_collection, Period, ResampledSeries, SiteResample,
};
pub use state::collection::{combine, SiteCollection};
pub use state::measurement::MeasurementSeries;
