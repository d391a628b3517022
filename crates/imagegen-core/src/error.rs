//! Error types for Imagegen

use thiserror::Error;

/// Main error type for Imagegen
#[derive(Error, Debug)]
pub enum ImagegenError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model '{0}' is currently disabled. Please select another model.")]
    ModelDisabled(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Generation service error: {0}")]
    Upstream(String),

    #[error("Unexpected response from generation service: {0}")]
    UpstreamFormat(String),

    #[error("Failed to fetch image from {url}: HTTP {status}")]
    UpstreamFetch { url: String, status: u16 },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Missing credential: {0} is not set in the environment")]
    MissingCredential(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ImagegenError {
    /// True for errors the user fixes by picking a different model or
    /// editing the model table.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImagegenError::Configuration(_) | ImagegenError::ModelDisabled(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ImagegenError>;
