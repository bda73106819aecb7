//! Offline summaries written next to the dataset so the dashboard can show
//! investor leaderboards without recomputing them on every interaction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::aggregate::{
    by_funding_type, by_industry, by_investor, by_location, by_startup, monthly_totals, rank_by_count,
    top, GroupTotal,
};
use crate::data::filter::{apply, FilterConfig};
use crate::data::model::FundingDataset;
use crate::error::Result;

pub const TOP_N: usize = 10;

pub const FUNDING_BY_MONTH_FILE: &str = "funding_by_yearmonth.csv";
pub const TOP_INDUSTRIES_FILE: &str = "top_industries.csv";
pub const TOP_STARTUPS_FILE: &str = "top_startups.csv";
pub const COUNTS_BY_TYPE_FILE: &str = "funding_counts_by_type.csv";
pub const TOP_LOCATIONS_FILE: &str = "top_locations.csv";
pub const INVESTORS_BY_FUNDING_FILE: &str = "top_investors_by_funding.csv";
pub const INVESTORS_BY_ROUNDS_FILE: &str = "top_investors_by_rounds.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorAmount {
    #[serde(rename = "Investor")]
    pub investor: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorRounds {
    #[serde(rename = "Investor")]
    pub investor: String,
    #[serde(rename = "Rounds")]
    pub rounds: usize,
}

/// Top investors by money deployed and by number of rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvestorLeaderboards {
    pub by_funding: Vec<InvestorAmount>,
    pub by_rounds: Vec<InvestorRounds>,
}

impl InvestorLeaderboards {
    pub fn from_groups(groups: Vec<GroupTotal>, n: usize) -> Self {
        let by_rounds = top(rank_by_count(groups.clone()), n)
            .into_iter()
            .map(|g| InvestorRounds {
                investor: g.key,
                rounds: g.count,
            })
            .collect();
        let by_funding = top(groups, n)
            .into_iter()
            .map(|g| InvestorAmount {
                investor: g.key,
                amount: g.total,
            })
            .collect();
        InvestorLeaderboards {
            by_funding,
            by_rounds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_funding.is_empty() && self.by_rounds.is_empty()
    }
}

/// Files produced by [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutputs {
    pub files: Vec<PathBuf>,
    /// `false` when the dataset carries no investor names.
    pub investors_written: bool,
}

fn write_pairs<I>(path: &Path, header: [&str; 2], rows: I) -> Result<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for (key, value) in rows {
        wtr.write_record([key, value])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pre-compute the summary tables over the whole dataset into `out_dir`.
pub fn analyze(dataset: &FundingDataset, out_dir: &Path) -> Result<AnalysisOutputs> {
    std::fs::create_dir_all(out_dir)?;
    let view = apply(dataset, &FilterConfig::default());
    let mut files = Vec::new();

    let path = out_dir.join(FUNDING_BY_MONTH_FILE);
    write_pairs(
        &path,
        ["YearMonth", "Amount"],
        monthly_totals(&view)
            .into_iter()
            .map(|(m, total)| (m.to_string(), total.to_string())),
    )?;
    files.push(path);

    let totals = |groups: Vec<GroupTotal>| {
        top(groups, TOP_N)
            .into_iter()
            .map(|g| (g.key, g.total.to_string()))
    };
    let counts = |groups: Vec<GroupTotal>, n: usize| {
        top(rank_by_count(groups), n)
            .into_iter()
            .map(|g| (g.key, g.count.to_string()))
    };

    let path = out_dir.join(TOP_INDUSTRIES_FILE);
    write_pairs(&path, ["Industry", "Amount"], totals(by_industry(&view)))?;
    files.push(path);

    let path = out_dir.join(TOP_STARTUPS_FILE);
    write_pairs(&path, ["Startup", "Amount"], totals(by_startup(&view)))?;
    files.push(path);

    let path = out_dir.join(COUNTS_BY_TYPE_FILE);
    write_pairs(&path, ["Type", "Count"], counts(by_funding_type(&view), usize::MAX))?;
    files.push(path);

    let path = out_dir.join(TOP_LOCATIONS_FILE);
    write_pairs(&path, ["Location", "Count"], counts(by_location(&view), TOP_N))?;
    files.push(path);

    let boards = InvestorLeaderboards::from_groups(by_investor(&view), TOP_N);
    let investors_written = !boards.is_empty();
    if investors_written {
        let path = out_dir.join(INVESTORS_BY_FUNDING_FILE);
        write_rows(&path, &boards.by_funding)?;
        files.push(path);

        let path = out_dir.join(INVESTORS_BY_ROUNDS_FILE);
        write_rows(&path, &boards.by_rounds)?;
        files.push(path);
    } else {
        log::warn!("No investor names in dataset; skipping investor analysis");
        // Leftovers from an earlier run would be read back as current.
        for name in [INVESTORS_BY_FUNDING_FILE, INVESTORS_BY_ROUNDS_FILE] {
            let stale = out_dir.join(name);
            if stale.exists() {
                std::fs::remove_file(&stale)?;
                log::info!("Removed stale {}", stale.display());
            }
        }
    }

    log::info!("Analysis outputs saved to {}", out_dir.display());
    Ok(AnalysisOutputs {
        files,
        investors_written,
    })
}

/// Read the investor leaderboards written by [`analyze`]. `None` if either
/// file is absent.
pub fn read_investor_leaderboards(dir: &Path) -> Result<Option<InvestorLeaderboards>> {
    let funding_path = dir.join(INVESTORS_BY_FUNDING_FILE);
    let rounds_path = dir.join(INVESTORS_BY_ROUNDS_FILE);
    if !funding_path.exists() || !rounds_path.exists() {
        return Ok(None);
    }

    let by_funding = csv::Reader::from_path(&funding_path)?
        .deserialize()
        .collect::<std::result::Result<Vec<InvestorAmount>, _>>()?;
    let by_rounds = csv::Reader::from_path(&rounds_path)?
        .deserialize()
        .collect::<std::result::Result<Vec<InvestorRounds>, _>>()?;

    Ok(Some(InvestorLeaderboards {
        by_funding,
        by_rounds,
    }))
}
