use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::state::collection::SiteCollection;
use crate::state::measurement::MeasurementSeries;

/// Bucket width for resampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Hour,
    Day,
    #[default]
    Month,
}

impl Period {
    /// Start of the bucket containing `t`, in `t`'s own (naive) time zone.
    pub fn bucket_start(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        match self {
            Period::Hour => {
                let hour = NaiveTime::from_hms_opt(t.hour(), 0, 0).unwrap_or(NaiveTime::MIN);
                date.and_time(hour)
            }
            Period::Day => date.and_time(NaiveTime::MIN),
            Period::Month => date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Hour => "hourly",
            Period::Day => "daily",
            Period::Month => "monthly",
        }
    }
}

/// Per-bucket means of a series.
///
/// `series.timestamps()` are bucket starts. Only buckets that received at least
/// one source row appear; a bucket whose rows held no valid value for a
/// variable carries `None` for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResampledSeries {
    pub period: Period,
    pub series: MeasurementSeries,
    /// Number of valid readings behind each bucket mean, per variable.
    pub counts: BTreeMap<String, Vec<usize>>,
}

impl ResampledSeries {
    pub fn site_id(&self) -> &str {
        self.series.site_id()
    }

    pub fn buckets(&self) -> &[NaiveDateTime] {
        self.series.timestamps()
    }

    /// Mean of `variable` in the bucket starting at `bucket`.
    /// `None` if the bucket was never observed; `Some(None)` if it held no valid values.
    pub fn get(&self, bucket: NaiveDateTime, variable: &str) -> Option<Option<f64>> {
        let idx = self.buckets().binary_search(&bucket).ok()?;
        self.series.variable(variable).map(|values| values[idx])
    }
}

/// Running sums for the bucket being filled, one slot per variable.
struct Accumulator {
    sums: Vec<f64>,
    counts: Vec<usize>,
}

impl Accumulator {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }

    fn flush_into(&self, means: &mut [Vec<Option<f64>>], counts: &mut [Vec<usize>]) {
        for (v, (sum, &n)) in self.sums.iter().zip(&self.counts).enumerate() {
            means[v].push(if n > 0 { Some(sum / n as f64) } else { None });
            counts[v].push(n);
        }
    }
}

/// Resample one series into `period` buckets, averaging the valid readings of
/// each requested variable. Single pass over time-ordered input.
pub fn resample(
    series: &MeasurementSeries,
    period: Period,
    variables: &[String],
) -> Result<ResampledSeries> {
    let columns: Vec<Vec<Option<f64>>> =
        variables.iter().map(|v| series.values_or_missing(v)).collect();

    let mut buckets: Vec<NaiveDateTime> = Vec::new();
    let mut means: Vec<Vec<Option<f64>>> = vec![Vec::new(); variables.len()];
    let mut counts: Vec<Vec<usize>> = vec![Vec::new(); variables.len()];

    let mut current: Option<NaiveDateTime> = None;
    let mut acc = Accumulator::new(variables.len());

    for (row, &t) in series.timestamps().iter().enumerate() {
        let key = period.bucket_start(t);
        if current != Some(key) {
            if current.is_some() {
                acc.flush_into(&mut means, &mut counts);
                acc = Accumulator::new(variables.len());
            }
            current = Some(key);
            buckets.push(key);
        }
        for (v, column) in columns.iter().enumerate() {
            if let Some(value) = column[row] {
                acc.sums[v] += value;
                acc.counts[v] += 1;
            }
        }
    }
    if current.is_some() {
        acc.flush_into(&mut means, &mut counts);
    }

    tracing::debug!(
        "Resampled site {} into {} {} buckets",
        series.site_id(),
        buckets.len(),
        period.label()
    );

    let values: BTreeMap<String, Vec<Option<f64>>> =
        variables.iter().cloned().zip(means).collect();
    Ok(ResampledSeries {
        period,
        series: MeasurementSeries::new(series.site_id(), buckets, values)?,
        counts: variables.iter().cloned().zip(counts).collect(),
    })
}

/// Each site resampled on its own. Sites are never averaged together; a
/// value is addressed by `(site_id, bucket)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteResample {
    pub period: Period,
    pub sites: BTreeMap<String, ResampledSeries>,
}

impl SiteResample {
    pub fn get(&self, site_id: &str, bucket: NaiveDateTime, variable: &str) -> Option<Option<f64>> {
        self.sites.get(site_id)?.get(bucket, variable)
    }

    /// Every `(site_id, bucket)` key, ordered by site then time.
    pub fn keys(&self) -> impl Iterator<Item = (&str, NaiveDateTime)> {
        self.sites
            .iter()
            .flat_map(|(id, r)| r.buckets().iter().map(move |b| (id.as_str(), *b)))
    }
}

/// Resample every site of a collection independently.
pub fn resample_collection(
    sites: &SiteCollection,
    period: Period,
    variables: &[String],
) -> Result<SiteResample> {
    let mut out = BTreeMap::new();
    for (id, series) in sites.iter() {
        out.insert(id.to_string(), resample(series, period, variables)?);
    }
    Ok(SiteResample { period, sites: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::collection::combine;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn series(site: &str, times: Vec<NaiveDateTime>, ghi: Vec<Option<f64>>) -> MeasurementSeries {
        let mut vars = BTreeMap::new();
        vars.insert("GHI".to_string(), ghi);
        MeasurementSeries::new(site, times, vars).unwrap()
    }

    fn ghi() -> Vec<String> {
        vec!["GHI".to_string()]
    }

    #[test]
    fn test_bucket_start() {
        let t = NaiveDate::from_ymd_opt(2022, 3, 17)
            .unwrap()
            .and_hms_opt(13, 45, 12)
            .unwrap();
        assert_eq!(Period::Hour.bucket_start(t).to_string(), "2022-03-17 13:00:00");
        assert_eq!(Period::Day.bucket_start(t).to_string(), "2022-03-17 00:00:00");
        assert_eq!(Period::Month.bucket_start(t).to_string(), "2022-03-01 00:00:00");
    }

    #[test]
    fn test_daily_mean() {
        let s = series(
            "A",
            vec![at(1, 1, 0), at(1, 2, 0), at(1, 3, 0)],
            vec![Some(10.0), Some(20.0), Some(30.0)],
        );
        let r = resample(&s, Period::Day, &ghi()).unwrap();
        assert_eq!(r.buckets(), &[at(1, 0, 0)]);
        assert_eq!(r.get(at(1, 0, 0), "GHI"), Some(Some(20.0)));
        assert_eq!(r.counts["GHI"], vec![3]);
    }

    #[test]
    fn test_missing_values_excluded_from_mean() {
        let s = series(
            "A",
            vec![at(1, 0, 10), at(1, 0, 20), at(1, 0, 30)],
            vec![Some(1.0), None, Some(3.0)],
        );
        let r = resample(&s, Period::Hour, &ghi()).unwrap();
        assert_eq!(r.get(at(1, 0, 0), "GHI"), Some(Some(2.0)));
    }

    #[test]
    fn test_unobserved_bucket_omitted_invalid_bucket_kept() {
        let s = series(
            "A",
            vec![at(1, 12, 0), at(3, 12, 0)],
            vec![Some(5.0), None],
        );
        let r = resample(&s, Period::Day, &ghi()).unwrap();

        assert_eq!(r.buckets(), &[at(1, 0, 0), at(3, 0, 0)]);
        assert_eq!(r.get(at(2, 0, 0), "GHI"), None);
        assert_eq!(r.get(at(3, 0, 0), "GHI"), Some(None));
        assert_eq!(r.counts["GHI"], vec![1, 0]);
    }

    #[test]
    fn test_absent_variable_is_all_missing() {
        let s = series("A", vec![at(1, 0, 0)], vec![Some(1.0)]);
        let r = resample(&s, Period::Day, &["RH".to_string()]).unwrap();
        assert_eq!(r.get(at(1, 0, 0), "RH"), Some(None));
    }

    #[test]
    fn test_empty_series() {
        let s = series("A", vec![], vec![]);
        let r = resample(&s, Period::Month, &ghi()).unwrap();
        assert!(r.buckets().is_empty());
    }

    #[test]
    fn test_collection_keeps_sites_apart() {
        let a = series("A", vec![at(1, 0, 0)], vec![Some(10.0)]);
        let b = series("B", vec![at(1, 0, 0)], vec![Some(30.0)]);
        let sites = combine(vec![a, b]).unwrap();
        let r = resample_collection(&sites, Period::Day, &ghi()).unwrap();

        assert_eq!(r.get("A", at(1, 0, 0), "GHI"), Some(Some(10.0)));
        assert_eq!(r.get("B", at(1, 0, 0), "GHI"), Some(Some(30.0)));
        let keys: Vec<_> = r.keys().collect();
        assert_eq!(keys, vec![("A", at(1, 0, 0)), ("B", at(1, 0, 0))]);
    }
}
