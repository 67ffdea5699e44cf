//! Asset loading errors.
//!
//! A failed load is terminal for that asset only: the error is logged, the
//! model slot stays empty, and the rest of the page keeps running.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The request could not be made or the body could not be read.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URI \"{uri}\" relative to {base}")]
    InvalidUri { uri: String, base: String },

    #[error("Malformed data URI: {0}")]
    DataUri(String),

    #[error("glTF parse error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// A structurally valid asset that lacks something required.
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Unsupported asset format \"{extension}\" for {url}")]
    UnsupportedFormat { url: String, extension: String },

    #[error("Load cancelled: {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;
