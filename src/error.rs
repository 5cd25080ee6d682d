//! Startup errors. Selection-time conditions are never errors.

use std::path::PathBuf;

/// A required input file is missing, unreadable, or malformed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV parse error in {path}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A numeric cell that is not a finite, non-negative number.
    #[error("invalid value \"{raw}\" in column '{column}' of {path} (row {row})")]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        raw: String,
    },

    #[error("duplicate subzone \"{key}\" in {path}")]
    DuplicateKey { path: PathBuf, key: String },

    #[error("failed to parse GeoJSON in {path}")]
    GeoJson {
        path: PathBuf,
        source: geojson::Error,
    },

    #[error("{path} must contain a GeoJSON FeatureCollection")]
    NotFeatureCollection { path: PathBuf },

    #[error("feature {index} (subzone \"{key}\") in {path} has no geometry")]
    MissingGeometry {
        path: PathBuf,
        index: usize,
        key: String,
    },

    #[error("feature {index} (subzone \"{key}\") in {path} has unsupported geometry: {kind}")]
    UnsupportedGeometry {
        path: PathBuf,
        index: usize,
        key: String,
        kind: String,
    },

    #[error("shapefile error in {path}")]
    Shapefile {
        path: PathBuf,
        source: shapefile::Error,
    },

    #[error("join column '{column}' in {path} must be text or numeric")]
    InvalidKeyField { path: PathBuf, column: String },

    #[error("unsupported boundary format {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Fatal errors raised while building the joined dataset.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The join produced no rows at all.
    #[error("merge resulted in an empty dataset ({boundaries} boundaries, {population} census rows)")]
    MergeIntegrity { boundaries: usize, population: usize },
}
