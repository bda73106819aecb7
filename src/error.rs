use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a file and producing a view.
///
/// Unparseable rows are not errors: they are dropped and recorded in the
/// dataset's [`LoadReport`](crate::data::model::LoadReport). An empty filter
/// result is not an error either.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("dataset is empty or no row could be parsed")]
    EmptyDataset,

    #[error("not enough monthly data to forecast: need {required} months, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("malformed input: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// Short message suitable for showing to the person driving the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            DataError::MissingFile { path } => format!(
                "No dataset found at {}. Upload or select a CSV to get started.",
                path.display()
            ),
            DataError::MissingColumns(cols) => format!(
                "The file must contain the columns Date, Startup, Industry, Location, Amount and Type (missing: {}).",
                cols.join(", ")
            ),
            DataError::EmptyDataset => {
                "Could not parse any rows. Make sure the file has valid 'Date' and 'Amount' columns."
                    .to_string()
            }
            DataError::InsufficientData { required, actual } => format!(
                "Not enough data to forecast: {actual} month(s) selected, at least {required} needed."
            ),
            DataError::UnsupportedFormat(ext) => {
                format!("Files of type .{ext} are not supported. Use CSV, JSON or Parquet.")
            }
            other => format!("Error: {other}"),
        }
    }
}
