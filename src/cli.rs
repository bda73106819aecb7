//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::model::FundingDataset;
use crate::forecast::{ForecastConfig, FORECAST_HORIZON};
use crate::state::SessionEvent;

pub const DEFAULT_DATASET: &str = "scripts/output/startup_funding.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "scripts/output";

/// Explore startup funding records: KPIs, rankings and a 12-month forecast
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a dataset, apply filters and print the dashboard
    Show(ShowArgs),
    /// Pre-compute summary and investor CSVs for the dashboard
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Path to the funding dataset (.csv, .json or .parquet)
    #[arg(short, long, default_value = DEFAULT_DATASET)]
    pub input: PathBuf,

    /// First year to include
    #[arg(long)]
    pub from_year: Option<i32>,

    /// Last year to include
    #[arg(long)]
    pub to_year: Option<i32>,

    /// Industry to include (repeatable; default all)
    #[arg(long = "industry")]
    pub industries: Vec<String>,

    /// Funding type to include (repeatable; default all)
    #[arg(long = "type")]
    pub funding_types: Vec<String>,

    /// Directory holding precomputed investor leaderboards
    #[arg(long)]
    pub analysis_dir: Option<PathBuf>,

    /// Months to forecast past the last observed month
    #[arg(long, default_value_t = FORECAST_HORIZON)]
    pub horizon: usize,

    /// Fit a trend only, without yearly seasonality
    #[arg(long)]
    pub no_seasonality: bool,

    /// Print the dashboard as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Write the filtered records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

impl ShowArgs {
    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            horizon: self.horizon,
            yearly_seasonality: !self.no_seasonality,
            ..ForecastConfig::default()
        }
    }

    /// Filter events implied by the arguments. An open year bound falls back
    /// to the dataset's earliest or latest year.
    pub fn filter_events(&self, dataset: &FundingDataset) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if self.from_year.is_some() || self.to_year.is_some() {
            if let Some((min, max)) = dataset.year_bounds() {
                events.push(SessionEvent::SetYearRange(
                    self.from_year.unwrap_or(min),
                    self.to_year.unwrap_or(max),
                ));
            }
        }
        if !self.industries.is_empty() {
            events.push(SessionEvent::SetIndustries(self.industries.iter().cloned().collect()));
        }
        if !self.funding_types.is_empty() {
            events.push(SessionEvent::SetFundingTypes(
                self.funding_types.iter().cloned().collect(),
            ));
        }
        events
    }
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the funding dataset
    #[arg(short, long, default_value = DEFAULT_DATASET)]
    pub input: PathBuf,

    /// Directory for the summary CSVs
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub out_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv_reader;

    fn show(args: &[&str]) -> ShowArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Show(s) => s,
            other => panic!("expected show, got {other:?}"),
        }
    }

    #[test]
    fn show_defaults() {
        let args = show(&["startup-funding", "show"]);
        assert_eq!(args.input, PathBuf::from(DEFAULT_DATASET));
        assert_eq!(args.horizon, 12);
        assert!(args.forecast_config().yearly_seasonality);
        assert!(!args.json);
    }

    #[test]
    fn repeatable_filters_become_events() {
        let args = show(&[
            "startup-funding",
            "show",
            "--from-year",
            "2016",
            "--industry",
            "Fintech",
            "--industry",
            "Edtech",
            "--type",
            "Seed Funding",
        ]);
        let ds = load_csv_reader(
            "Date,Startup,Industry,Location,Amount,Type\n2015-01-01,A,Fintech,Pune,1,Seed\n2017-01-01,B,Edtech,Pune,1,Seed\n"
                .as_bytes(),
        )
        .unwrap();
        let events = args.filter_events(&ds);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SessionEvent::SetYearRange(2016, 2017));
        match &events[1] {
            SessionEvent::SetIndustries(set) => assert_eq!(set.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn analyze_args() {
        let cli = Cli::try_parse_from(["startup-funding", "-v", "analyze", "-o", "/tmp/out"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Analyze(a) => assert_eq!(a.out_dir, PathBuf::from("/tmp/out")),
            other => panic!("expected analyze, got {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["startup-funding"]).is_err());
    }
}
