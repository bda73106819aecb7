//! End-to-end tests over the public API: load → filter → aggregate/forecast → export.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use startup_funding::analysis::{analyze, read_investor_leaderboards};
use startup_funding::data::aggregate::{by_industry, kpis};
use startup_funding::data::export::to_csv_bytes;
use startup_funding::forecast::forecast_series;
use startup_funding::state::{ForecastPanel, InvestorSource};
use startup_funding::{
    apply, forecast, load_file, DataError, FilterConfig, ForecastConfig, Session, SessionEvent,
    YearMonth,
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/funding_sample.csv")
}

#[test]
fn loader_keeps_valid_rows_only() {
    let ds = load_file(&fixture()).unwrap();
    assert_eq!(ds.report.rows_read, 14);
    // bad date, undisclosed amount, negative amount
    assert_eq!(ds.report.dropped.len(), 3);
    assert_eq!(ds.len(), 11);
    assert!(ds.len() <= ds.report.rows_read);
    for rec in &ds.records {
        assert!(rec.amount.is_finite() && rec.amount >= 0.0);
    }
    assert!(ds.funding_types.contains("Other"));
    assert!(ds.industries.contains("Healthcare"));
}

#[test]
fn select_all_filter_returns_whole_table() {
    let ds = load_file(&fixture()).unwrap();
    let view = apply(&ds, &FilterConfig::select_all(&ds));
    assert_eq!(view.len(), ds.len());
}

#[test]
fn filtered_view_is_subset_and_totals_reconcile() {
    let ds = load_file(&fixture()).unwrap();
    let config = FilterConfig {
        industries: BTreeSet::from(["Fintech".to_string(), "Transport".to_string()]),
        ..FilterConfig::default()
    }
    .with_year_range(2015, 2016);
    let view = apply(&ds, &config);

    assert_eq!(view.len(), 4);
    for rec in view.iter() {
        assert!(ds.records.contains(rec));
    }

    let industry_sum: f64 = by_industry(&view).iter().map(|g| g.total).sum();
    let k = kpis(&view);
    assert!((industry_sum - k.total_amount).abs() < 1e-6);
    assert_eq!(k.distinct_startups, 3);
}

#[test]
fn forecast_over_fixture_has_twelve_future_months() {
    let ds = load_file(&fixture()).unwrap();
    let view = apply(&ds, &FilterConfig::default());
    let fc = forecast(&view, &ForecastConfig::default()).unwrap();

    let future: Vec<_> = fc.future().collect();
    assert_eq!(future.len(), 12);
    assert_eq!(fc.last_observed, YearMonth::new(2017, 3));
    assert_eq!(future[0].month, YearMonth::new(2017, 4));
    assert_eq!(future[11].month, YearMonth::new(2018, 3));
    for p in &fc.points {
        assert!(p.lower <= p.predicted && p.predicted <= p.upper);
    }
    // Jan 2015 .. Mar 2017, zero-filled
    assert_eq!(fc.history().count(), 27);
}

#[test]
fn two_month_scenario() {
    let fc = forecast_series(
        &[(YearMonth::new(2015, 1), 100.0), (YearMonth::new(2015, 2), 200.0)],
        &ForecastConfig::default(),
    )
    .unwrap();
    assert_eq!(fc.points.len(), 14);
    assert!((fc.points[0].predicted - 100.0).abs() < 1e-6);
}

#[test]
fn year_without_rows_is_not_an_error() {
    let mut session = Session::new();
    session.open_default(&fixture());
    let view = session.handle(SessionEvent::SetYearRange(2030, 2031));
    assert_eq!(view.kpis.total_amount, 0.0);
    assert_eq!(view.kpis.rounds, 0);
    assert!(view.top_industries.is_empty());
    assert!(matches!(view.forecast, ForecastPanel::Skipped { .. }));
}

#[test]
fn single_month_selection_skips_forecast() {
    let ds = load_file(&fixture()).unwrap();
    let config = FilterConfig {
        industries: BTreeSet::from(["Edtech".to_string()]),
        ..FilterConfig::default()
    };
    let err = forecast(&apply(&ds, &config), &ForecastConfig::default()).unwrap_err();
    assert!(matches!(err, DataError::InsufficientData { actual: 1, .. }));
}

#[test]
fn exported_csv_reloads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let ds = load_file(&fixture()).unwrap();
    let view = apply(&ds, &FilterConfig::default().with_year_range(2016, 2016));
    let path = dir.path().join("filtered_startup_funding.csv");
    std::fs::write(&path, to_csv_bytes(&view).unwrap()).unwrap();

    let again = load_file(&path).unwrap();
    assert_eq!(again.len(), view.len());
    assert!(again.report.dropped.is_empty());
    assert_eq!(again.years, BTreeSet::from([2016]));
}

#[test]
fn parquet_files_load_like_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funding.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Date32, true),
        Field::new("Startup", DataType::Utf8, false),
        Field::new("Industry", DataType::Utf8, false),
        Field::new("Location", DataType::Utf8, false),
        Field::new("Amount", DataType::Float64, true),
        Field::new("Type", DataType::Utf8, false),
    ]));
    // 16436 = 2015-01-01, 16467 = 2015-02-01
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(vec![Some(16436), Some(16467), None])),
        Arc::new(StringArray::from(vec!["Ola", "Paytm", "Ghost"])),
        Arc::new(StringArray::from(vec!["transport", "Fintech", "Fintech"])),
        Arc::new(StringArray::from(vec!["Bangalore", "Noida", "Pune"])),
        Arc::new(Float64Array::from(vec![Some(1_000_000.0), None, Some(5.0)])),
        Arc::new(StringArray::from(vec!["Seed Funding", "Seed Funding", "Seed Funding"])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load_file(&path).unwrap();
    assert_eq!(ds.report.rows_read, 3);
    assert_eq!(ds.len(), 1);
    let ola = &ds.records[0];
    assert_eq!(ola.startup, "Ola");
    assert_eq!(ola.industry, "Transport");
    assert_eq!(ola.amount, 1_000_000.0);
    assert_eq!(ola.date.to_string(), "2015-01-01");
}

#[test]
fn json_files_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funding.json");
    std::fs::write(
        &path,
        r#"[{"Date":"2015-01-05","Startup":"Ola","Industry":"Transport","Location":"Bangalore","Amount":"1,000","Type":"Seed Funding"}]"#,
    )
    .unwrap();
    let ds = load_file(&path).unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.records[0].amount, 1000.0);
}

#[test]
fn session_prefers_precomputed_investors() {
    let dir = tempfile::tempdir().unwrap();
    let ds = load_file(&fixture()).unwrap();
    analyze(&ds, dir.path()).unwrap();
    assert!(read_investor_leaderboards(dir.path()).unwrap().is_some());

    let mut session = Session::new().with_analysis_dir(dir.path());
    let view = session.open_default(&fixture());
    assert!(view.warnings.is_empty());
    let panel = view.investors.unwrap();
    assert_eq!(panel.source, InvestorSource::Precomputed);
    assert_eq!(panel.boards.by_rounds[0].investor, "Tiger Global");

    // Precomputed boards cover the whole dataset regardless of filters.
    let narrowed = session.handle(SessionEvent::SetYearRange(2017, 2017));
    assert_eq!(narrowed.investors.unwrap().boards, panel.boards);
}

#[test]
fn unsupported_extension_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funding.xlsx");
    std::fs::write(&path, b"nope").unwrap();
    assert!(matches!(load_file(&path), Err(DataError::UnsupportedFormat(_))));
}
