use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::filter::FilteredView;
use super::model::{FundingRecord, YearMonth};

// ---------------------------------------------------------------------------
// Grouped totals
// ---------------------------------------------------------------------------

/// Total amount and number of rounds for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub count: usize,
}

/// Headline numbers for the current view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_amount: f64,
    pub distinct_startups: usize,
    pub rounds: usize,
}

fn group_by<'a, I, F>(records: I, mut keys: F) -> Vec<GroupTotal>
where
    I: IntoIterator<Item = &'a FundingRecord>,
    F: FnMut(&'a FundingRecord) -> Vec<String>,
{
    let mut acc: HashMap<String, (f64, usize)> = HashMap::new();
    for rec in records {
        for key in keys(rec) {
            let entry = acc.entry(key).or_insert((0.0, 0));
            entry.0 += rec.amount;
            entry.1 += 1;
        }
    }
    let mut groups: Vec<GroupTotal> = acc
        .into_iter()
        .map(|(key, (total, count))| GroupTotal { key, total, count })
        .collect();
    rank_by_total(&mut groups);
    groups
}

/// Descending total, ties by key ascending.
pub fn rank_by_total(groups: &mut [GroupTotal]) {
    groups.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
}

/// Re-sort by number of rounds (descending, ties by key ascending).
pub fn rank_by_count(mut groups: Vec<GroupTotal>) -> Vec<GroupTotal> {
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// The first `n` groups.
pub fn top(mut groups: Vec<GroupTotal>, n: usize) -> Vec<GroupTotal> {
    groups.truncate(n);
    groups
}

pub fn by_industry(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| vec![r.industry.clone()])
}

pub fn by_startup(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| vec![r.startup.clone()])
}

pub fn by_location(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| vec![r.location.clone()])
}

pub fn by_funding_type(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| vec![r.funding_type.clone()])
}

/// Keys are `YYYY-MM`. Ranked by total like every other grouping; use
/// [`monthly_totals`] for a chronological series.
pub fn by_month(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| vec![r.year_month().to_string()])
}

/// Split comma-separated investor lists; every named investor is credited
/// with the full round amount and one round.
pub fn by_investor(view: &FilteredView<'_>) -> Vec<GroupTotal> {
    group_by(view.iter(), |r| investor_names(&r.investor))
}

/// Distinct, trimmed, non-blank names from an investor cell.
pub fn investor_names(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Chronological monthly totals over observed months only.
pub fn monthly_totals(view: &FilteredView<'_>) -> Vec<(YearMonth, f64)> {
    let mut months: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for rec in view.iter() {
        *months.entry(rec.year_month()).or_default() += rec.amount;
    }
    months.into_iter().collect()
}

pub fn kpis(view: &FilteredView<'_>) -> Kpis {
    let startups: BTreeSet<&str> = view.iter().map(|r| r.startup.as_str()).collect();
    Kpis {
        total_amount: view.iter().map(|r| r.amount).sum(),
        distinct_startups: startups.len(),
        rounds: view.len(),
    }
}

// ---------------------------------------------------------------------------
// City markers for the map
// ---------------------------------------------------------------------------

/// Known coordinates (lat, lon) of the main startup hubs.
const CITY_COORDS: &[(&str, f64, f64)] = &[
    ("Bangalore", 12.9716, 77.5946),
    ("Bengaluru", 12.9716, 77.5946),
    ("Mumbai", 19.0760, 72.8777),
    ("Delhi", 28.7041, 77.1025),
    ("New Delhi", 28.6139, 77.2090),
    ("Gurgaon", 28.4595, 77.0266),
    ("Gurugram", 28.4595, 77.0266),
    ("Noida", 28.5355, 77.3910),
    ("Hyderabad", 17.3850, 78.4867),
    ("Chennai", 13.0827, 80.2707),
    ("Pune", 18.5204, 73.8567),
    ("Kolkata", 22.5726, 88.3639),
    ("Jaipur", 26.9124, 75.7873),
    ("Ahmedabad", 23.0225, 72.5714),
];

pub fn city_coords(city: &str) -> Option<(f64, f64)> {
    CITY_COORDS
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(city.trim()))
        .map(|&(_, lat, lon)| (lat, lon))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityMarker {
    pub city: String,
    pub rounds: usize,
    pub lat: f64,
    pub lon: f64,
}

/// Markers for the `n` cities with the most rounds. Cities without known
/// coordinates are left off the map.
pub fn city_markers(locations: &[GroupTotal], n: usize) -> Vec<CityMarker> {
    top(rank_by_count(locations.to_vec()), n)
        .into_iter()
        .filter_map(|g| {
            let (lat, lon) = city_coords(&g.key)?;
            Some(CityMarker {
                city: g.key,
                rounds: g.count,
                lat,
                lon,
            })
        })
        .collect()
}
