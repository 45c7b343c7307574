use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Stat, Undefined};
use crate::state::measurement::MeasurementSeries;

/// Descriptive statistics for one variable, skipping missing readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub missing: usize,
    pub mean: Stat,
    pub std_dev: Stat,
    pub min: Stat,
    pub q25: Stat,
    pub median: Stat,
    pub q75: Stat,
    pub max: Stat,
}

impl Summary {
    /// Compute statistics from a column. `std_dev` is the sample (n - 1) deviation.
    pub fn compute(values: &[Option<f64>]) -> Self {
        let mut vals: Vec<f64> = values.iter().flatten().copied().collect();
        let count = vals.len();
        let missing = values.len() - count;

        if vals.is_empty() {
            let empty = Stat::Undefined(Undefined::EmptyValidSample);
            return Summary {
                count,
                missing,
                mean: empty,
                std_dev: empty,
                min: empty,
                q25: empty,
                median: empty,
                q75: empty,
                max: empty,
            };
        }

        vals.sort_by(|a, b| a.total_cmp(b));

        Summary {
            count,
            missing,
            mean: mean(&vals).into(),
            std_dev: std_dev(&vals, 1).into(),
            min: Stat::Value(vals[0]),
            q25: Stat::Value(quantile_sorted(&vals, 0.25)),
            median: Stat::Value(quantile_sorted(&vals, 0.5)),
            q75: Stat::Value(quantile_sorted(&vals, 0.75)),
            max: Stat::Value(vals[count - 1]),
        }
    }

    /// Format as a multi-line report string.
    pub fn report(&self, label: &str) -> String {
        let fmt = |s: &Stat| match s {
            Stat::Value(v) => format!("{v:.3}"),
            Stat::Undefined(u) => format!("undefined ({u})"),
        };
        format!(
            "{}:\n  Count: {}\n  Missing: {}\n  Mean: {}\n  Std Dev: {}\n  Min: {}\n  25%: {}\n  Median: {}\n  75%: {}\n  Max: {}\n",
            label,
            self.count,
            self.missing,
            fmt(&self.mean),
            fmt(&self.std_dev),
            fmt(&self.min),
            fmt(&self.q25),
            fmt(&self.median),
            fmt(&self.q75),
            fmt(&self.max),
        )
    }
}

/// Summaries for the requested variables. Absent variables summarize as all-missing.
pub fn describe(series: &MeasurementSeries, variables: &[String]) -> BTreeMap<String, Summary> {
    variables
        .iter()
        .map(|name| {
            let summary = match series.variable(name) {
                Some(values) => Summary::compute(values),
                None => Summary::compute(&series.values_or_missing(name)),
            };
            (name.clone(), summary)
        })
        .collect()
}

/// Count of missing readings per variable the series reports.
pub fn missing_counts(series: &MeasurementSeries) -> BTreeMap<String, usize> {
    series
        .variables()
        .iter()
        .map(|(name, values)| (name.clone(), values.iter().filter(|v| v.is_none()).count()))
        .collect()
}

pub(crate) fn mean(vals: &[f64]) -> Result<f64, Undefined> {
    if vals.is_empty() {
        return Err(Undefined::EmptyValidSample);
    }
    Ok(vals.iter().sum::<f64>() / vals.len() as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub(crate) fn std_dev(vals: &[f64], ddof: usize) -> Result<f64, Undefined> {
    let m = mean(vals)?;
    if vals.len() <= ddof {
        return Err(Undefined::TooFewValues);
    }
    let ss = vals.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Ok((ss / (vals.len() - ddof) as f64).sqrt())
}

/// True when `vals` has no spread: every value is identical, or the computed
/// deviation underflowed to zero. Rounding in the mean of constant data never
/// turns it into a defined spread.
pub(crate) fn is_zero_spread(vals: &[f64], spread: f64) -> bool {
    spread == 0.0 || vals.windows(2).all(|w| w[0] == w[1])
}

/// Linear-interpolation quantile of sorted, non-empty data.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_matches_describe() {
        let values = [Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)];
        let s = Summary::compute(&values);

        assert_eq!(s.count, 4);
        assert_eq!(s.missing, 1);
        assert_eq!(s.mean, Stat::Value(2.5));
        assert_eq!(s.min, Stat::Value(1.0));
        assert_eq!(s.q25, Stat::Value(1.75));
        assert_eq!(s.median, Stat::Value(2.5));
        assert_eq!(s.q75, Stat::Value(3.25));
        assert_eq!(s.max, Stat::Value(4.0));
        let sd = s.std_dev.value().unwrap();
        assert!((sd - 1.2909944).abs() < 1e-6);
    }

    #[test]
    fn test_summary_all_missing() {
        let s = Summary::compute(&[None, None]);
        assert_eq!(s.count, 0);
        assert_eq!(s.missing, 2);
        assert_eq!(s.mean, Stat::Undefined(Undefined::EmptyValidSample));
    }

    #[test]
    fn test_single_value_has_no_sample_std() {
        let s = Summary::compute(&[Some(5.0)]);
        assert_eq!(s.mean, Stat::Value(5.0));
        assert_eq!(s.std_dev, Stat::Undefined(Undefined::TooFewValues));
    }

    #[test]
    fn test_population_std() {
        let sd = std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0], 0).unwrap();
        assert!((sd - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_spread_only_for_constant_data() {
        let constant = [0.1 + 0.2; 7];
        let sd = std_dev(&constant, 0).unwrap();
        assert!(is_zero_spread(&constant, sd));

        let tiny = [1e-16, 2e-16, 3e-16];
        let sd = std_dev(&tiny, 0).unwrap();
        assert!(sd > 0.0);
        assert!(!is_zero_spread(&tiny, sd));
    }

    #[test]
    fn test_report_mentions_undefined() {
        let report = Summary::compute(&[None]).report("GHI");
        assert!(report.starts_with("GHI:"));
        assert!(report.contains("undefined (no valid values)"));
    }
}
