use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::{read_investor_leaderboards, InvestorLeaderboards, TOP_N};
use crate::data::aggregate::{
    by_funding_type, by_industry, by_investor, by_location, by_startup, city_markers, kpis,
    monthly_totals, rank_by_count, top, CityMarker, GroupTotal, Kpis,
};
use crate::data::export::to_csv_bytes;
use crate::data::filter::{apply, FilterConfig};
use crate::data::loader::{load_bytes, load_file};
use crate::data::model::{FundingDataset, YearMonth};
use crate::error::{DataError, Result};
use crate::forecast::{forecast, Forecast, ForecastConfig};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything a user can do to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoadPath(PathBuf),
    Upload { name: String, bytes: Vec<u8> },
    /// Inclusive, either order.
    SetYearRange(i32, i32),
    SetIndustries(BTreeSet<String>),
    SetFundingTypes(BTreeSet<String>),
    ToggleIndustry(String),
    ToggleFundingType(String),
    /// Select every available value in every dimension.
    SelectAll,
    /// Drop the dataset and filters; configuration is kept.
    Reset,
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub years: BTreeSet<i32>,
    pub industries: BTreeSet<String>,
    pub funding_types: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastPanel {
    Ready(Forecast),
    Skipped { reason: String },
}

impl Default for ForecastPanel {
    fn default() -> Self {
        ForecastPanel::Skipped {
            reason: "No dataset loaded.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorSource {
    /// Read from the offline analysis output (whole dataset).
    Precomputed,
    /// Computed from the current filtered view.
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestorPanel {
    pub source: InvestorSource,
    #[serde(flatten)]
    pub boards: InvestorLeaderboards,
}

/// Everything the presentation layer needs to draw the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub status: Option<String>,
    pub warnings: Vec<String>,
    pub dataset_rows: usize,
    pub rows_dropped: usize,
    pub filter_options: FilterOptions,
    pub filters: FilterConfig,
    pub kpis: Kpis,
    pub monthly_trend: Vec<(YearMonth, f64)>,
    pub forecast: ForecastPanel,
    pub top_industries: Vec<GroupTotal>,
    pub top_startups: Vec<GroupTotal>,
    pub rounds_by_type: Vec<GroupTotal>,
    pub top_locations: Vec<GroupTotal>,
    pub investors: Option<InvestorPanel>,
    pub city_markers: Vec<CityMarker>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's dashboard state, independent of rendering.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Loaded dataset (None until a file is loaded).
    pub dataset: Option<FundingDataset>,

    /// Current filter selections.
    pub filters: FilterConfig,

    pub forecast_config: ForecastConfig,

    /// Where `analyze` wrote its investor leaderboards, if anywhere.
    pub analysis_dir: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.analysis_dir = Some(dir.into());
        self
    }

    pub fn with_forecast_config(mut self, config: ForecastConfig) -> Self {
        self.forecast_config = config;
        self
    }

    /// Load the default dataset. A missing file leaves the session usable
    /// without data and explains what to do.
    pub fn open_default(&mut self, path: &Path) -> DashboardView {
        self.handle(SessionEvent::LoadPath(path.to_path_buf()))
    }

    /// Ingest a newly loaded dataset and select everything.
    pub fn set_dataset(&mut self, dataset: FundingDataset) {
        self.filters = FilterConfig::select_all(&dataset);
        self.status_message = match dataset.report.dropped.len() {
            0 => None,
            n => Some(format!("{n} row(s) could not be parsed and were skipped.")),
        };
        self.dataset = Some(dataset);
    }

    fn load_result(&mut self, result: Result<FundingDataset>) {
        match result {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.status_message = Some(e.user_message());
            }
        }
    }

    /// Apply one event and return the freshly computed view.
    pub fn handle(&mut self, event: SessionEvent) -> DashboardView {
        log::debug!("Session event: {event:?}");
        match event {
            SessionEvent::LoadPath(path) => {
                let result = load_file(&path);
                self.load_result(result);
            }
            SessionEvent::Upload { name, bytes } => {
                let result = load_bytes(&name, &bytes);
                self.load_result(result);
            }
            SessionEvent::SetYearRange(from, to) => {
                self.filters = std::mem::take(&mut self.filters).with_year_range(from, to);
            }
            SessionEvent::SetIndustries(set) => self.filters.industries = set,
            SessionEvent::SetFundingTypes(set) => self.filters.funding_types = set,
            SessionEvent::ToggleIndustry(name) => toggle(&mut self.filters.industries, name),
            SessionEvent::ToggleFundingType(name) => toggle(&mut self.filters.funding_types, name),
            SessionEvent::SelectAll => {
                if let Some(ds) = &self.dataset {
                    self.filters = FilterConfig::select_all(ds);
                }
            }
            SessionEvent::Reset => {
                self.dataset = None;
                self.filters = FilterConfig::default();
                self.status_message = None;
            }
        }
        self.view()
    }

    /// Run the pipeline over the current dataset and filters.
    pub fn view(&self) -> DashboardView {
        let Some(dataset) = &self.dataset else {
            return DashboardView {
                status: Some(
                    self.status_message
                        .clone()
                        .unwrap_or_else(|| "No dataset loaded. Upload or select a CSV.".to_string()),
                ),
                filters: self.filters.clone(),
                ..DashboardView::default()
            };
        };

        let view = apply(dataset, &self.filters);
        let mut warnings = Vec::new();

        let forecast = match forecast(&view, &self.forecast_config) {
            Ok(fc) => ForecastPanel::Ready(fc),
            Err(e) => ForecastPanel::Skipped {
                reason: e.user_message(),
            },
        };

        let locations = by_location(&view);
        let investors = self.investor_panel(by_investor(&view), &mut warnings);

        DashboardView {
            status: self.status_message.clone(),
            warnings,
            dataset_rows: dataset.len(),
            rows_dropped: dataset.report.dropped.len(),
            filter_options: FilterOptions {
                years: dataset.years.clone(),
                industries: dataset.industries.clone(),
                funding_types: dataset.funding_types.clone(),
            },
            filters: self.filters.clone(),
            kpis: kpis(&view),
            monthly_trend: monthly_totals(&view),
            forecast,
            top_industries: top(by_industry(&view), TOP_N),
            top_startups: top(by_startup(&view), TOP_N),
            rounds_by_type: rank_by_count(by_funding_type(&view)),
            city_markers: city_markers(&locations, TOP_N),
            top_locations: top(rank_by_count(locations), TOP_N),
            investors,
        }
    }

    /// Prefer the precomputed leaderboards when an analysis directory is
    /// configured; otherwise, or when they are missing, rank the filtered view.
    fn investor_panel(&self, live: Vec<GroupTotal>, warnings: &mut Vec<String>) -> Option<InvestorPanel> {
        if let Some(dir) = &self.analysis_dir {
            match read_investor_leaderboards(dir) {
                Ok(Some(boards)) => {
                    return Some(InvestorPanel {
                        source: InvestorSource::Precomputed,
                        boards,
                    })
                }
                Ok(None) => warnings.push(
                    "Run `startup-funding analyze` first to generate investor CSVs.".to_string(),
                ),
                Err(e) => {
                    log::warn!("Could not read investor leaderboards from {}: {e}", dir.display());
                    warnings.push(e.user_message());
                }
            }
        }

        let boards = InvestorLeaderboards::from_groups(live, TOP_N);
        (!boards.is_empty()).then_some(InvestorPanel {
            source: InvestorSource::Filtered,
            boards,
        })
    }

    /// The filtered records as CSV, for download.
    pub fn export_filtered(&self) -> Result<Vec<u8>> {
        let dataset = self.dataset.as_ref().ok_or(DataError::EmptyDataset)?;
        to_csv_bytes(&apply(dataset, &self.filters))
    }
}

fn toggle(set: &mut BTreeSet<String>, value: String) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Startup,Industry,Location,Investor,Amount,Type
2015-01-05,Ola,Transport,Bangalore,SoftBank,100,Seed Funding
2015-02-05,Paytm,Fintech,Noida,Alibaba,200,Private Equity
2016-03-01,Zomato,Food,Gurgaon,Info Edge,300,Seed Funding
";

    fn loaded() -> Session {
        let mut session = Session::new();
        session.handle(SessionEvent::Upload {
            name: "funding.csv".into(),
            bytes: SAMPLE.as_bytes().to_vec(),
        });
        session
    }

    #[test]
    fn no_dataset_view_explains_itself() {
        let view = Session::new().view();
        assert!(view.status.unwrap().contains("No dataset loaded"));
        assert_eq!(view.kpis, Kpis::default());
        assert!(matches!(view.forecast, ForecastPanel::Skipped { .. }));
    }

    #[test]
    fn missing_default_dataset_degrades() {
        let mut session = Session::new();
        let view = session.open_default(Path::new("/no/such/startup_funding.csv"));
        assert!(session.dataset.is_none());
        assert!(view.status.unwrap().contains("No dataset found"));

        // still usable afterwards
        let view = session.handle(SessionEvent::Upload {
            name: "funding.csv".into(),
            bytes: SAMPLE.as_bytes().to_vec(),
        });
        assert_eq!(view.kpis.rounds, 3);
        assert_eq!(view.status, None);
    }

    #[test]
    fn upload_selects_everything() {
        let session = loaded();
        let view = session.view();
        assert_eq!(view.dataset_rows, 3);
        assert_eq!(view.kpis.total_amount, 600.0);
        assert_eq!(view.filters.years, BTreeSet::from([2015, 2016]));
        assert!(matches!(view.forecast, ForecastPanel::Ready(_)));
        assert_eq!(view.top_industries[0].key, "Food");
        let investors = view.investors.unwrap();
        assert_eq!(investors.source, InvestorSource::Filtered);
        assert_eq!(investors.boards.by_funding[0].investor, "Info Edge");
    }

    #[test]
    fn year_with_no_rows_gives_zero_kpis() {
        let mut session = loaded();
        let view = session.handle(SessionEvent::SetYearRange(2020, 2020));
        assert_eq!(view.kpis, Kpis::default());
        assert!(view.top_industries.is_empty());
        assert!(view.monthly_trend.is_empty());
        assert!(view.investors.is_none());
        match view.forecast {
            ForecastPanel::Skipped { reason } => assert!(reason.contains("Not enough data")),
            other => panic!("expected skipped forecast, got {other:?}"),
        }
    }

    #[test]
    fn unbounded_year_range_keeps_every_row() {
        let mut session = loaded();
        let view = session.handle(SessionEvent::SetYearRange(2016, 2_000_000_000));
        assert_eq!(view.kpis.rounds, 1);
        let view = session.handle(SessionEvent::SetYearRange(i32::MIN, i32::MAX));
        assert_eq!(view.kpis.rounds, 3);
        assert_eq!(view.filters.years, BTreeSet::from([2015, 2016]));
    }

    #[test]
    fn toggles_narrow_and_restore() {
        let mut session = loaded();
        let view = session.handle(SessionEvent::ToggleFundingType("Private Equity".into()));
        assert_eq!(view.kpis.rounds, 2);
        let view = session.handle(SessionEvent::ToggleFundingType("Private Equity".into()));
        assert_eq!(view.kpis.rounds, 3);

        let view = session.handle(SessionEvent::SetIndustries(["Fintech".to_string()].into()));
        assert_eq!(view.kpis.rounds, 1);
        let view = session.handle(SessionEvent::SelectAll);
        assert_eq!(view.kpis.rounds, 3);
    }

    #[test]
    fn reset_returns_to_empty_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new().with_analysis_dir(dir.path());
        session.handle(SessionEvent::Upload {
            name: "funding.csv".into(),
            bytes: SAMPLE.as_bytes().to_vec(),
        });
        let view = session.handle(SessionEvent::Reset);
        assert!(session.dataset.is_none());
        assert_eq!(view.dataset_rows, 0);
        assert_eq!(view.filters, FilterConfig::default());
        assert!(view.status.unwrap().contains("No dataset loaded"));
        assert_eq!(session.analysis_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn failed_upload_keeps_previous_dataset() {
        let mut session = loaded();
        let view = session.handle(SessionEvent::Upload {
            name: "broken.csv".into(),
            bytes: b"Date,Startup\n2015-01-01,A\n".to_vec(),
        });
        assert_eq!(view.dataset_rows, 3);
        assert!(view.status.unwrap().contains("missing: Industry"));
    }

    #[test]
    fn missing_precomputed_investors_warns_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new().with_analysis_dir(dir.path());
        let view = session.handle(SessionEvent::Upload {
            name: "funding.csv".into(),
            bytes: SAMPLE.as_bytes().to_vec(),
        });
        assert_eq!(view.warnings.len(), 1);
        assert_eq!(view.investors.unwrap().source, InvestorSource::Filtered);
    }

    #[test]
    fn export_respects_filters() {
        let mut session = loaded();
        session.handle(SessionEvent::SetYearRange(2016, 2016));
        let csv = String::from_utf8(session.export_filtered().unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Zomato"));
        assert!(Session::new().export_filtered().is_err());
    }

    #[test]
    fn view_serializes_to_json() {
        let view = loaded().view();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["forecast"]["status"], "ready");
        assert_eq!(json["kpis"]["rounds"], 3);
        assert_eq!(json["monthly_trend"][0][0], "2015-01");
    }
}
