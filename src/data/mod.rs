//! Data layer: core types, loading, filtering, aggregation and export.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet / uploaded bytes
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse + normalise → FundingDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────────┐
//!   │ FundingDataset  │  Vec<FundingRecord>, year/industry/type index
//!   └────────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  year / industry / type predicates → FilteredView
//!   └──────────┘
//!        │
//!        ├──────────────┬───────────────┐
//!        ▼              ▼               ▼
//!   ┌───────────┐  ┌──────────┐   ┌──────────┐
//!   │ aggregate │  │ forecast │   │  export  │
//!   └───────────┘  └──────────┘   └──────────┘
//! ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
