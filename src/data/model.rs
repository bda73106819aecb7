use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// YearMonth – calendar month key
// ---------------------------------------------------------------------------

/// A calendar month. Orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        YearMonth { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth::new(date.year(), date.month())
    }

    /// The following month.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            YearMonth::new(self.year + 1, 1)
        } else {
            YearMonth::new(self.year, self.month + 1)
        }
    }

    /// Number of months from `self` to `later` (negative if `later` is earlier).
    pub fn months_until(self, later: YearMonth) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + (later.month as i64 - self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// FundingRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single investment event (one row of the source table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingRecord {
    pub date: NaiveDate,
    pub startup: String,
    pub industry: String,
    /// City.
    pub location: String,
    /// Raw investor list, possibly comma-separated. May be empty.
    pub investor: String,
    /// Non-negative, finite currency amount.
    pub amount: f64,
    /// Funding round category, e.g. "Seed Funding".
    pub funding_type: String,
}

impl FundingRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}

// ---------------------------------------------------------------------------
// LoadReport – what the loader kept and dropped
// ---------------------------------------------------------------------------

/// Why a source row was not kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    /// 1-based data row number (header excluded).
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped: Vec<RowIssue>,
}

// ---------------------------------------------------------------------------
// FundingDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed filter choices.
#[derive(Debug, Clone)]
pub struct FundingDataset {
    /// All records in file order.
    pub records: Vec<FundingRecord>,
    pub years: BTreeSet<i32>,
    pub industries: BTreeSet<String>,
    pub funding_types: BTreeSet<String>,
    pub report: LoadReport,
}

impl FundingDataset {
    /// Build the filter indices from the loaded records.
    pub fn from_records(records: Vec<FundingRecord>, report: LoadReport) -> Self {
        let mut years = BTreeSet::new();
        let mut industries = BTreeSet::new();
        let mut funding_types = BTreeSet::new();

        for rec in &records {
            years.insert(rec.year());
            industries.insert(rec.industry.clone());
            funding_types.insert(rec.funding_type.clone());
        }

        FundingDataset {
            records,
            years,
            industries,
            funding_types,
            report,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest year present, if any.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let first = self.years.iter().next()?;
        let last = self.years.iter().next_back()?;
        Some((*first, *last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: (i32, u32, u32), industry: &str, kind: &str) -> FundingRecord {
        FundingRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            startup: "Acme".into(),
            industry: industry.into(),
            location: "Pune".into(),
            investor: String::new(),
            amount: 1.0,
            funding_type: kind.into(),
        }
    }

    #[test]
    fn year_month_steps_over_year_end() {
        let dec = YearMonth::new(2019, 12);
        assert_eq!(dec.succ(), YearMonth::new(2020, 1));
        assert_eq!(dec.months_until(YearMonth::new(2021, 2)), 14);
        assert_eq!(dec.to_string(), "2019-12");
    }

    #[test]
    fn year_month_serializes_as_text() {
        let json = serde_json::to_string(&YearMonth::new(2015, 3)).unwrap();
        assert_eq!(json, "\"2015-03\"");
    }

    #[test]
    fn dataset_indexes_filter_choices() {
        let ds = FundingDataset::from_records(
            vec![
                record((2016, 5, 1), "Fintech", "Seed"),
                record((2015, 1, 9), "Edtech", "Seed"),
                record((2017, 2, 3), "Fintech", "Series A"),
            ],
            LoadReport::default(),
        );
        assert_eq!(ds.year_bounds(), Some((2015, 2017)));
        assert_eq!(ds.industries.len(), 2);
        assert_eq!(ds.funding_types.len(), 2);
        assert_eq!(ds.len(), 3);
    }
}
