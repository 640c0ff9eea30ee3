//! Error types for catalog access

use thiserror::Error;

/// Errors produced by catalog search and the local scene store.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid scene manifest: {0}")]
    Manifest(String),

    #[error("scene {scene_id} has no {band} band asset")]
    MissingBand { scene_id: String, band: String },

    #[error("invalid date: {0}")]
    Date(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] urbdiff_core::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
