use std::io::Read;
use std::path::Path;

use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{FundingDataset, FundingRecord, LoadReport, RowIssue};
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a funding dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row + one funding round per line
/// * `.json`    – `[{ "Date": "...", "Startup": "...", ... }, ...]`
/// * `.parquet` – one column per field, any scalar type
pub fn load_file(path: &Path) -> Result<FundingDataset> {
    if !path.exists() {
        return Err(DataError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "txt" => load_csv_reader(std::fs::File::open(path)?),
        "json" => load_json_slice(&std::fs::read(path)?),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }?;

    log::info!(
        "Loaded {} funding rounds from {} ({} rows dropped)",
        dataset.len(),
        path.display(),
        dataset.report.dropped.len()
    );
    Ok(dataset)
}

/// Load an uploaded file held in memory. The upload's name picks the format;
/// a name without extension is read as CSV.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<FundingDataset> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv_reader(bytes),
        "json" => load_json_slice(bytes),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Accepted spellings per field, compared after lower-casing and dropping
/// everything but letters and digits.
const DATE_NAMES: &[&str] = &["date", "dateddmmyyyy", "fundingdate"];
const STARTUP_NAMES: &[&str] = &["startup", "startupname", "company", "companyname"];
const INDUSTRY_NAMES: &[&str] = &["industry", "industryvertical", "vertical", "sector"];
const LOCATION_NAMES: &[&str] = &["location", "citylocation", "city"];
const AMOUNT_NAMES: &[&str] = &["amount", "amountinusd", "amountusd", "fundingamount"];
const TYPE_NAMES: &[&str] = &[
    "type",
    "investmenttype",
    "investmentntype",
    "fundingtype",
    "roundtype",
];
const INVESTOR_NAMES: &[&str] = &["investor", "investors", "investorname", "investorsname"];

fn canonical(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Position of each field in a source row.
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    date: usize,
    startup: usize,
    industry: usize,
    location: usize,
    amount: usize,
    funding_type: usize,
    investor: Option<usize>,
}

impl ColumnMap {
    fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let canon: Vec<String> = headers.iter().map(|h| canonical(h.as_ref())).collect();
        let find = |names: &[&str]| canon.iter().position(|h| names.contains(&h.as_str()));

        let mut missing = Vec::new();
        let mut require = |names: &[&str], label: &str| {
            let idx = find(names);
            if idx.is_none() {
                missing.push(label.to_string());
            }
            idx.unwrap_or_default()
        };

        let date = require(DATE_NAMES, "Date");
        let startup = require(STARTUP_NAMES, "Startup");
        let industry = require(INDUSTRY_NAMES, "Industry");
        let location = require(LOCATION_NAMES, "Location");
        let amount = require(AMOUNT_NAMES, "Amount");
        let funding_type = require(TYPE_NAMES, "Type");

        if !missing.is_empty() {
            return Err(DataError::MissingColumns(missing));
        }

        Ok(ColumnMap {
            date,
            startup,
            industry,
            location,
            amount,
            funding_type,
            investor: find(INVESTOR_NAMES),
        })
    }
}

// ---------------------------------------------------------------------------
// Cell normalisation
// ---------------------------------------------------------------------------

/// Tried in order; day-first wins over month-first on ambiguous input.
/// Only used when the text carries a four-digit year.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d", "%m/%d/%Y",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];
/// Two-digit years: 00-68 map to 20xx, 69-99 to 19xx.
const SHORT_YEAR_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%m/%d/%y"];

/// True if some run of ASCII digits in `s` is exactly four long.
fn has_four_digit_year(s: &str) -> bool {
    s.split(|c: char| !c.is_ascii_digit()).any(|run| run.len() == 4)
}

/// Parse a calendar date from the formats commonly found in funding exports.
///
/// `%Y` alone would read `09/01/15` as year 15, so the long-year formats are
/// gated on a four-digit run and short years go through `%y`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if !has_four_digit_year(s) {
        return SHORT_YEAR_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    // `YYYY-MM` period labels
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()
}

/// Parse a currency amount such as `1,000,000`, `$5M`, `250k` or `4.6E+08`.
///
/// Returns `None` for anything unparseable, negative or non-finite.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_') && !c.is_whitespace())
        .collect();

    let (number, scale) = match cleaned.chars().last()? {
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1e6),
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1e3),
        _ => (cleaned.as_str(), 1.0),
    };

    let value = number.parse::<f64>().ok()? * scale;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Capitalise the first letter of every word, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn normalize_type(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("unknown") {
        "Other".to_string()
    } else {
        title_case(t)
    }
}

fn normalize_row(columns: &ColumnMap, cells: &[String]) -> std::result::Result<FundingRecord, String> {
    let cell = |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");

    let raw_date = cell(columns.date);
    let date = parse_date(raw_date).ok_or_else(|| format!("unparseable date '{raw_date}'"))?;

    let raw_amount = cell(columns.amount);
    let amount =
        parse_amount(raw_amount).ok_or_else(|| format!("missing or invalid amount '{raw_amount}'"))?;

    let startup = cell(columns.startup);
    let industry = cell(columns.industry);
    let location = cell(columns.location);
    for (value, label) in [(startup, "startup"), (industry, "industry"), (location, "location")] {
        if value.is_empty() {
            return Err(format!("blank {label}"));
        }
    }

    Ok(FundingRecord {
        date,
        startup: startup.to_string(),
        industry: title_case(industry),
        location: location.to_string(),
        investor: columns.investor.map(cell).unwrap_or("").to_string(),
        amount,
        funding_type: normalize_type(cell(columns.funding_type)),
    })
}

/// Accumulates normalised rows and the report of dropped ones.
#[derive(Default)]
struct Collector {
    records: Vec<FundingRecord>,
    report: LoadReport,
}

impl Collector {
    fn push(&mut self, columns: &ColumnMap, line: usize, cells: &[String]) {
        self.report.rows_read += 1;
        match normalize_row(columns, cells) {
            Ok(rec) => self.records.push(rec),
            Err(reason) => self.skip(line, reason),
        }
    }

    fn skip(&mut self, line: usize, reason: String) {
        log::debug!("Dropping row {line}: {reason}");
        self.report.dropped.push(RowIssue { line, reason });
    }

    fn finish(mut self) -> Result<FundingDataset> {
        if self.records.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        self.report.rows_kept = self.records.len();
        Ok(FundingDataset::from_records(self.records, self.report))
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read delimited text with a header row. Fields are decoded lossily so
/// stray non-UTF-8 bytes do not reject a whole file.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<FundingDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DataError::EmptyDataset);
    }
    let columns = ColumnMap::resolve(&headers)?;

    let mut collector = Collector::default();
    for (row_no, result) in reader.byte_records().enumerate() {
        let record = result?;
        let cells: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        collector.push(&columns, row_no + 1, &cells);
    }

    collector.finish()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Date": "2017-01-09", "Startup": "Zomato", "Industry": "Food",
///     "Location": "Gurgaon", "Amount": 2000000, "Type": "Seed Funding" },
///   ...
/// ]
/// ```
fn load_json_slice(bytes: &[u8]) -> Result<FundingDataset> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let rows = root
        .as_array()
        .ok_or_else(|| DataError::Malformed("expected a top-level JSON array".into()))?;

    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }
    if headers.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    let columns = ColumnMap::resolve(&headers)?;

    let mut collector = Collector::default();
    for (i, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            collector.report.rows_read += 1;
            collector.skip(i + 1, "not a JSON object".into());
            continue;
        };
        let cells: Vec<String> = headers
            .iter()
            .map(|h| obj.get(h).map(json_to_cell).unwrap_or_default())
            .collect();
        collector.push(&columns, i + 1, &cells);
    }

    collector.finish()
}

fn json_to_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Every column is rendered to text and fed through the
/// same normalisation as CSV, so Utf8, numeric and Date32 columns all work.
fn load_parquet(path: &Path) -> Result<FundingDataset> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let columns = ColumnMap::resolve(&headers)?;
    let reader = builder.build()?;

    let mut collector = Collector::default();
    let mut line = 0;
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            line += 1;
            let cells = batch
                .columns()
                .iter()
                .map(|col| {
                    if col.is_null(row) {
                        Ok(String::new())
                    } else {
                        array_value_to_string(col.as_ref(), row)
                    }
                })
                .collect::<std::result::Result<Vec<String>, _>>()?;
            collector.push(&columns, line, &cells);
        }
    }

    collector.finish()
}
