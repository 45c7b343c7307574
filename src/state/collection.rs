use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AnalysisError, Result};
use crate::state::measurement::MeasurementSeries;

/// Site id given to the all-sites view built by [`SiteCollection::merged`].
pub const COMBINED_SITE_ID: &str = "combined";

/// Every loaded site, keyed by site id. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SiteCollection {
    sites: BTreeMap<String, MeasurementSeries>,
}

/// Merge per-site series into one collection.
///
/// Sites need not share a variable schema; a variable a site lacks simply
/// reads as missing for that site.
pub fn combine(series: impl IntoIterator<Item = MeasurementSeries>) -> Result<SiteCollection> {
    let mut sites = BTreeMap::new();
    for s in series {
        let id = s.site_id().to_string();
        if sites.contains_key(&id) {
            return Err(AnalysisError::DuplicateSiteId(id));
        }
        sites.insert(id, s);
    }
    tracing::debug!("Combined {} sites", sites.len());
    Ok(SiteCollection { sites })
}

impl SiteCollection {
    /// A one-entry collection, so single-site analysis runs the same pipeline.
    pub fn single(series: MeasurementSeries) -> Self {
        let mut sites = BTreeMap::new();
        sites.insert(series.site_id().to_string(), series);
        Self { sites }
    }

    pub fn get(&self, site_id: &str) -> Option<&MeasurementSeries> {
        self.sites.get(site_id)
    }

    pub fn site_ids(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MeasurementSeries)> {
        self.sites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Union of the variable names reported by any site.
    pub fn variable_names(&self) -> BTreeSet<String> {
        self.sites
            .values()
            .flat_map(|s| s.variable_names().map(String::from))
            .collect()
    }

    /// Concatenate every site into one time-ordered series.
    ///
    /// Rows with equal timestamps keep site-id order. Variables missing from a
    /// site are `None` for that site's rows. Values are never averaged across
    /// sites here.
    pub fn merged(&self) -> Result<MeasurementSeries> {
        let names = self.variable_names();

        let mut rows: Vec<(&MeasurementSeries, usize)> = self
            .sites
            .values()
            .flat_map(|s| (0..s.len()).map(move |i| (s, i)))
            .collect();
        rows.sort_by_key(|(s, i)| s.timestamps()[*i]);

        let timestamps = rows.iter().map(|(s, i)| s.timestamps()[*i]).collect();
        let variables = names
            .into_iter()
            .map(|name| {
                let column = rows
                    .iter()
                    .map(|(s, i)| s.variable(&name).and_then(|v| v[*i]))
                    .collect();
                (name, column)
            })
            .collect();

        MeasurementSeries::new(COMBINED_SITE_ID, timestamps, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn series(site: &str, var: &str, hours: &[u32], values: &[f64]) -> MeasurementSeries {
        let mut vars = BTreeMap::new();
        vars.insert(var.to_string(), values.iter().map(|v| Some(*v)).collect());
        MeasurementSeries::new(site, hours.iter().map(|h| ts(*h)).collect(), vars).unwrap()
    }

    #[test]
    fn test_combine_rejects_duplicate_site() {
        let a1 = series("A", "GHI", &[0], &[1.0]);
        let a2 = series("A", "GHI", &[1], &[2.0]);
        let err = combine(vec![a1, a2]).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateSiteId(ref id) if id == "A"));
    }

    #[test]
    fn test_combine_allows_different_schemas() {
        let a = series("A", "GHI", &[0], &[1.0]);
        let b = series("B", "RH", &[0], &[50.0]);
        let sites = combine(vec![a, b]).unwrap();
        assert_eq!(sites.len(), 2);
        assert!(sites.get("A").unwrap().has_variable("GHI"));
        assert!(!sites.get("A").unwrap().has_variable("RH"));
        assert_eq!(sites.variable_names().len(), 2);
    }

    #[test]
    fn test_merged_interleaves_by_time() {
        let a = series("A", "GHI", &[0, 2], &[1.0, 3.0]);
        let b = series("B", "RH", &[1], &[50.0]);
        let merged = combine(vec![a, b]).unwrap().merged().unwrap();

        assert_eq!(merged.site_id(), COMBINED_SITE_ID);
        assert_eq!(merged.timestamps(), &[ts(0), ts(1), ts(2)]);
        assert_eq!(merged.variable("GHI").unwrap(), &[Some(1.0), None, Some(3.0)]);
        assert_eq!(merged.variable("RH").unwrap(), &[None, Some(50.0), None]);
    }

    #[test]
    fn test_single_is_one_entry() {
        let sites = SiteCollection::single(series("A", "GHI", &[0], &[1.0]));
        assert_eq!(sites.site_ids().collect::<Vec<_>>(), vec!["A"]);
    }
}
