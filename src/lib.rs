//! Startup funding explorer.
//!
//! Loads funding records, filters them by year, industry and round type, and
//! produces the KPIs, rankings and 12-month forecast behind the dashboard.
//! The [`state::Session`] turns user events into a [`state::DashboardView`].

pub mod analysis;
pub mod cli;
pub mod data;
pub mod error;
pub mod forecast;
pub mod report;
pub mod state;

pub use data::filter::{apply, FilterConfig, FilteredView};
pub use data::loader::{load_bytes, load_csv_reader, load_file};
pub use data::model::{FundingDataset, FundingRecord, YearMonth};
pub use error::{DataError, Result};
pub use forecast::{forecast, Forecast, ForecastConfig, ForecastPoint};
pub use state::{DashboardView, Session, SessionEvent};
