use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::print_batches;
use chrono::{Datelike, Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use startup_funding::data::export::write_csv;
use startup_funding::FundingRecord;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const STARTUPS: &[(&str, &str, &str)] = &[
    ("Ola", "Transport", "Bangalore"),
    ("Paytm", "Fintech", "Noida"),
    ("Zomato", "Food & Beverage", "Gurgaon"),
    ("Swiggy", "Food & Beverage", "Bangalore"),
    ("Byju's", "Edtech", "Bangalore"),
    ("Razorpay", "Fintech", "Bangalore"),
    ("Oyo Rooms", "Hospitality", "Gurgaon"),
    ("Nykaa", "E-Commerce", "Mumbai"),
    ("Practo", "Healthcare", "Bangalore"),
    ("Urban Company", "Consumer Services", "Gurgaon"),
    ("Zoho", "Saas", "Chennai"),
    ("Freshworks", "Saas", "Chennai"),
    ("Dunzo", "Logistics", "Bangalore"),
    ("Unacademy", "Edtech", "Bangalore"),
    ("PolicyBazaar", "Fintech", "Gurgaon"),
    ("Lenskart", "E-Commerce", "Delhi"),
    ("FirstCry", "E-Commerce", "Pune"),
    ("Housing.com", "Real Estate", "Mumbai"),
    ("CarDekho", "Automotive", "Jaipur"),
    ("Rapido", "Transport", "Hyderabad"),
];

const TYPES: &[(&str, f64)] = &[
    ("Seed Funding", 13.0),
    ("Private Equity", 16.0),
    ("Series A", 15.0),
    ("Series B", 16.5),
    ("Debt Funding", 14.5),
];

const INVESTORS: &[&str] = &[
    "Sequoia Capital",
    "Accel Partners",
    "Tiger Global",
    "SoftBank",
    "Kalaari Capital",
    "Nexus Venture Partners",
    "Blume Ventures",
    "Matrix Partners",
    "Info Edge",
    "Helion Ventures",
];

fn generate(rng: &mut SimpleRng, start: NaiveDate) -> Vec<FundingRecord> {
    let mut records = Vec::new();

    // 60 months, more deals late in the year and a slow upward trend
    for month in 0..60 {
        let seasonal = if month % 12 >= 9 { 4.0 } else { 0.0 };
        let deals = (6.0 + month as f64 / 10.0 + seasonal + rng.gauss(0.0, 1.5)).max(1.0) as usize;
        for _ in 0..deals {
            let day = month * 30 + (rng.next_u64() % 28) as i64;
            let date = start + Duration::days(day);
            let &(startup, industry, location) = rng.pick(STARTUPS);
            let &(funding_type, log_mean) = rng.pick(TYPES);

            let n_investors = 1 + (rng.next_u64() % 3) as usize;
            let mut investors: Vec<&str> = Vec::with_capacity(n_investors);
            for _ in 0..n_investors {
                let name = *rng.pick(INVESTORS);
                if !investors.contains(&name) {
                    investors.push(name);
                }
            }

            let amount = (rng.gauss(log_mean, 0.8).exp() / 1000.0).round() * 1000.0;
            records.push(FundingRecord {
                date,
                startup: startup.to_string(),
                industry: industry.to_string(),
                location: location.to_string(),
                investor: investors.join(", "),
                amount,
                funding_type: funding_type.to_string(),
            });
        }
    }
    records
}

fn string_column<F>(records: &[FundingRecord], field: F) -> ArrayRef
where
    F: Fn(&FundingRecord) -> &str,
{
    Arc::new(StringArray::from(records.iter().map(field).collect::<Vec<_>>()))
}

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn to_batch(records: &[FundingRecord]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Date32, false),
        Field::new("Startup", DataType::Utf8, false),
        Field::new("Industry", DataType::Utf8, false),
        Field::new("Location", DataType::Utf8, false),
        Field::new("Investor", DataType::Utf8, false),
        Field::new("Amount", DataType::Float64, false),
        Field::new("Type", DataType::Utf8, false),
    ]));

    let dates = Date32Array::from(
        records
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect::<Vec<_>>(),
    );
    let amounts = Float64Array::from(records.iter().map(|r| r.amount).collect::<Vec<_>>());

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(dates),
            string_column(records, |r| r.startup.as_str()),
            string_column(records, |r| r.industry.as_str()),
            string_column(records, |r| r.location.as_str()),
            string_column(records, |r| r.investor.as_str()),
            Arc::new(amounts),
            string_column(records, |r| r.funding_type.as_str()),
        ],
    )
    .context("building record batch")
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("scripts/output"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).context("invalid start date")?;
    let records = generate(&mut rng, start);

    // CSV
    let csv_path = out_dir.join("startup_funding.csv");
    let file = std::fs::File::create(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    write_csv(records.iter(), file).context("writing CSV")?;

    // Parquet
    let batch = to_batch(&records)?;
    let parquet_path = out_dir.join("startup_funding.parquet");
    let file = std::fs::File::create(&parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    print_batches(&[batch.slice(0, batch.num_rows().min(5))]).context("printing preview")?;
    println!(
        "Wrote {} funding rounds to {} and {}",
        records.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
