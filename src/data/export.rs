use std::io::Write;

use super::filter::FilteredView;
use super::model::FundingRecord;
use crate::error::Result;

pub const EXPORT_HEADER: [&str; 7] = [
    "Date", "Startup", "Industry", "Location", "Investor", "Amount", "Type",
];

/// Write records as CSV with ISO dates. The output loads back unchanged.
pub fn write_csv<'a, W, I>(records: I, writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a FundingRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for rec in records {
        let date = rec.date.format("%Y-%m-%d").to_string();
        let amount = rec.amount.to_string();
        wtr.write_record([
            date.as_str(),
            rec.startup.as_str(),
            rec.industry.as_str(),
            rec.location.as_str(),
            rec.investor.as_str(),
            amount.as_str(),
            rec.funding_type.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// The filtered view as a downloadable CSV payload.
pub fn to_csv_bytes(view: &FilteredView<'_>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(view.iter(), &mut buf)?;
    Ok(buf)
}
