use serde::Serialize;

use crate::error::{Stat, Undefined};
use crate::processing::statistics::is_zero_spread;
use crate::state::measurement::MeasurementSeries;

/// Square matrix of Pearson coefficients over a fixed variable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    variables: Vec<String>,
    /// Row-major, `variables.len()` squared entries.
    values: Vec<Stat>,
}

impl CorrelationMatrix {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Coefficient for a pair, or `None` if either name is not in the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<Stat> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i * self.variables.len() + j])
    }

    /// One row per variable, in matrix order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Stat])> {
        let n = self.variables.len().max(1);
        self.variables
            .iter()
            .map(|v| v.as_str())
            .zip(self.values.chunks(n))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }
}

/// Pearson correlation of every pair of `variables`, each over the rows where
/// both have a value. Repeated names are ignored after their first occurrence.
///
/// Entries are undefined when fewer than two such rows exist or either side is
/// constant over them. Absent variables read as all-missing.
pub fn correlate(series: &MeasurementSeries, variables: &[String]) -> CorrelationMatrix {
    let mut names: Vec<String> = Vec::with_capacity(variables.len());
    for v in variables {
        if !names.contains(v) {
            names.push(v.clone());
        }
    }

    let columns: Vec<Vec<Option<f64>>> = names.iter().map(|v| series.values_or_missing(v)).collect();
    let n = names.len();
    let mut values = vec![Stat::Undefined(Undefined::TooFewValues); n * n];

    for i in 0..n {
        for j in i..n {
            let r = Stat::from(pearson(&columns[i], &columns[j]));
            let r = match r {
                Stat::Value(_) if i == j => Stat::Value(1.0),
                other => other,
            };
            values[i * n + j] = r;
            values[j * n + i] = r;
        }
    }

    let undefined = values.iter().filter(|s| !s.is_defined()).count();
    if undefined > 0 {
        tracing::debug!(
            "Site {}: {undefined} of {} correlation entries undefined",
            series.site_id(),
            n * n
        );
    }

    CorrelationMatrix {
        variables: names,
        values,
    }
}

/// Pearson coefficient over pairwise-complete observations.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Result<f64, Undefined> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return Err(Undefined::TooFewValues);
    }

    let count = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / count;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / count;

    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    if is_zero_spread(&xs, saa) || is_zero_spread(&ys, sbb) {
        return Err(Undefined::ZeroVariance);
    }
    // n - 1 cancels between covariance and the two deviations.
    Ok((sab / (saa.sqrt() * sbb.sqrt())).clamp(-1.0, 1.0))
}
