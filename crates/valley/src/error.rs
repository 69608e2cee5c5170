//! Error types for segment processing and whole runs

use std::path::PathBuf;
use thiserror::Error;

/// Failure confined to a single segment; the batch logs it and moves on
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("geometry operation failed: {0}")]
    Geometry(#[from] hgvc_core::Error),
}

/// Failure that ends the run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("cannot read {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: hgvc_core::Error,
    },

    #[error("input rasters do not share a grid: {0}")]
    Grid(String),

    #[error("invalid segment registry: {0}")]
    Registry(String),

    #[error("invalid configuration: {0}")]
    Config(#[source] hgvc_core::Error),

    #[error("cannot derive run rasters: {0}")]
    Derive(#[source] hgvc_core::Error),

    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: hgvc_core::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
