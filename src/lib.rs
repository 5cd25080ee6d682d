//! Census subzone statistics joined onto planning boundaries, filtered by
//! region and summarized for a choropleth dashboard.

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod join;
pub mod server;
pub mod types;

pub use aggregate::{AggregateResult, Percentage};
pub use config::AppConfig;
pub use error::{LoadError, PipelineError};
pub use join::CensusDataset;
pub use types::{JoinedRecord, RegionSelection, SubzoneKey};
