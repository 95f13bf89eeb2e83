use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::site::Site;

/// Accumulated minutes per site. Values are always finite and non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTotals", into = "BTreeMap<Site, f64>")]
pub struct Totals(BTreeMap<Site, f64>);

impl Totals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds minutes to a site. Negative and non-finite values are ignored, so totals can only
    /// grow.
    pub fn add(&mut self, site: &Site, minutes: f64) {
        if !minutes.is_finite() || minutes < 0. {
            warn!("Ignoring invalid amount of minutes {minutes} for {site}");
            return;
        }
        *self.0.entry(site.clone()).or_insert(0.) += minutes;
    }

    pub fn get(&self, site: &str) -> Option<f64> {
        self.0.get(site).copied()
    }

    /// Same as [Totals::get], but sites without records have spent 0 minutes.
    pub fn minutes(&self, site: &str) -> f64 {
        self.get(site).unwrap_or(0.)
    }

    /// Sum over all sites.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Site, f64)> {
        self.0.iter().map(|(site, minutes)| (site, *minutes))
    }

    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.0.keys()
    }

    /// Sites ordered from most to least time spent.
    pub fn by_time_spent(&self) -> Vec<(&Site, f64)> {
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<(Site, f64)> for Totals {
    fn from_iter<T: IntoIterator<Item = (Site, f64)>>(iter: T) -> Self {
        let mut totals = Totals::new();
        for (site, minutes) in iter {
            totals.add(&site, minutes);
        }
        totals
    }
}

impl From<Totals> for BTreeMap<Site, f64> {
    fn from(value: Totals) -> Self {
        value.0
    }
}

/// Older writers stored either plain minutes or `{ "time": minutes }` per site.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredMinutes {
    Minutes(f64),
    Detailed { time: f64 },
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawTotals(BTreeMap<String, StoredMinutes>);

impl From<RawTotals> for Totals {
    fn from(RawTotals(raw): RawTotals) -> Self {
        let mut totals = Totals::new();
        for (key, stored) in raw {
            let minutes = match stored {
                StoredMinutes::Minutes(v) | StoredMinutes::Detailed { time: v } => v,
            };
            match Site::from_host(&key) {
                Some(site) => totals.add(&site, minutes),
                None => warn!("Dropping stored entry with illegal site {key:?}"),
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::{Site, Totals};

    fn site(v: &str) -> Site {
        Site::from_host(v).unwrap()
    }

    #[test]
    fn add_accumulates_and_ignores_invalid_values() {
        let mut totals = Totals::new();
        totals.add(&site("github.com"), 1.5);
        totals.add(&site("github.com"), 2.);
        totals.add(&site("github.com"), -4.);
        totals.add(&site("github.com"), f64::NAN);
        totals.add(&site("reddit.com"), 0.5);

        assert_eq!(totals.minutes(&site("github.com")), 3.5);
        assert_eq!(totals.get("reddit.com"), Some(0.5));
        assert_eq!(totals.total(), 4.);
    }

    #[test]
    fn by_time_spent_sorts_descending() {
        let totals = Totals::from_iter([
            (site("a.com"), 1.),
            (site("b.com"), 3.),
            (site("c.com"), 2.),
        ]);
        let order = totals
            .by_time_spent()
            .into_iter()
            .map(|(s, _)| s.to_string())
            .collect::<Vec<_>>();
        assert_eq!(order, ["b.com", "c.com", "a.com"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let totals = Totals::from_iter([(site("github.com"), 12.5)]);
        let json = serde_json::to_string(&totals).unwrap();
        assert_eq!(json, r#"{"github.com":12.5}"#);
    }

    #[test]
    fn deserializes_legacy_shapes() {
        let totals: Totals = serde_json::from_str(
            r#"{
                "github.com": 12.3,
                "youtube.com": { "time": 8.5 },
                "www.github.com": 0.7,
                "broken.com": -3,
                "": 4
            }"#,
        )
        .unwrap();

        assert_eq!(totals.len(), 2);
        assert!((totals.minutes(&site("github.com")) - 13.).abs() < 1e-9);
        assert_eq!(totals.minutes(&site("youtube.com")), 8.5);
    }
}
