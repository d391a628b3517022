//! Core type definitions for Imagegen

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ImagegenError, Result};

/// Image extensions the gallery treats as primary entries (compared lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Extension of the sidecar metadata file
pub const METADATA_EXTENSION: &str = "json";

/// Display text for a field the sidecar could not supply
pub const UNAVAILABLE: &str = "Not available";

/// Payload keys injected per request; never allowed in a model's base parameters
pub const RESERVED_PARAMETERS: &[&str] = &["prompt", "seed"];

/// A single base parameter value sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&ParamValue> for serde_json::Value {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Int(i) => serde_json::Value::from(*i),
            ParamValue::Float(f) => serde_json::Value::from(*f),
            ParamValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// A named model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Service-side model identifier, e.g. `black-forest-labs/flux-schnell`
    pub endpoint: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub disabled: bool,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            parameters: BTreeMap::new(),
            disabled: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// The `output_format` base parameter, if it is a string
    pub fn output_format(&self) -> Option<&str> {
        match self.parameters.get("output_format") {
            Some(ParamValue::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Build the request payload: base parameters, then `prompt`, then
    /// `seed` only when the caller supplied one.
    pub fn build_payload(&self, prompt: &str, seed: Option<u64>) -> serde_json::Map<String, serde_json::Value> {
        let mut payload: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
            .collect();

        payload.insert("prompt".to_string(), serde_json::Value::String(prompt.to_string()));
        if let Some(seed) = seed {
            payload.insert("seed".to_string(), serde_json::Value::from(seed));
        }
        payload
    }
}

/// A single user-initiated generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_name: String,
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model_name: model_name.into(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ImagegenError::Validation("Please enter a prompt".to_string()));
        }
        Ok(())
    }
}

/// Downloaded image plus what is known about how it was produced
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image_bytes: Bytes,
    pub resolved_seed: Option<u64>,
    pub output_format: String,
}

/// Canonical sidecar schema written next to every image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub prompt: String,
    pub model_name: String,
    pub seed: Option<u64>,
}

/// Paths of a freshly written artifact pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub resolved_seed: Option<u64>,
}

/// Gallery sort order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Model,
}

impl SortKey {
    pub fn all() -> &'static [SortKey] {
        &[SortKey::Newest, SortKey::Oldest, SortKey::Model]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Model => "model",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" | "newest first" => Ok(SortKey::Newest),
            "oldest" | "oldest first" => Ok(SortKey::Oldest),
            "model" | "model name" => Ok(SortKey::Model),
            other => Err(format!(
                "unknown sort key '{}' (expected newest, oldest or model)",
                other
            )),
        }
    }
}

/// Where a record's timestamp came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    Filename,
    Filesystem,
}

/// One image in the gallery view, rebuilt on every scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryRecord {
    pub file_path: PathBuf,
    pub file_name: String,
    pub prompt: Option<String>,
    pub model_name: Option<String>,
    pub seed: Option<u64>,
    pub timestamp: NaiveDateTime,
    pub timestamp_source: TimestampSource,
}

impl GalleryRecord {
    pub fn prompt_display(&self) -> &str {
        self.prompt.as_deref().unwrap_or(UNAVAILABLE)
    }

    pub fn model_display(&self) -> &str {
        self.model_name.as_deref().unwrap_or(UNAVAILABLE)
    }

    pub fn seed_display(&self) -> String {
        self.seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }
}

/// A single page of the gallery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryPage {
    pub records: Vec<GalleryRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schnell() -> ModelConfig {
        ModelConfig::new("schnell", "black-forest-labs/flux-schnell")
            .with_param("num_outputs", ParamValue::Int(1))
            .with_param("output_format", ParamValue::String("webp".into()))
    }

    #[test]
    fn test_payload_omits_seed_when_not_supplied() {
        let payload = schnell().build_payload("a red fox", None);
        assert_eq!(payload["prompt"], "a red fox");
        assert_eq!(payload["num_outputs"], 1);
        assert!(!payload.contains_key("seed"));
    }

    #[test]
    fn test_payload_sets_supplied_seed() {
        let payload = schnell().build_payload("a red fox", Some(42));
        assert_eq!(payload["seed"], 42);
    }

    #[test]
    fn test_payload_does_not_mutate_config() {
        let config = schnell();
        let _ = config.build_payload("x", Some(1));
        assert!(!config.parameters.contains_key("prompt"));
        assert!(!config.parameters.contains_key("seed"));
    }

    #[test]
    fn test_param_value_untagged_parsing() {
        let params: BTreeMap<String, ParamValue> = serde_json::from_str(
            r#"{"guidance": 3.5, "num_outputs": 1, "go_fast": true, "aspect_ratio": "1:1"}"#,
        )
        .unwrap();
        assert_eq!(params["guidance"], ParamValue::Float(3.5));
        assert_eq!(params["num_outputs"], ParamValue::Int(1));
        assert_eq!(params["go_fast"], ParamValue::Bool(true));
        assert_eq!(params["aspect_ratio"], ParamValue::String("1:1".into()));
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = GenerationRequest::new("   ", "schnell").validate().unwrap_err();
        assert!(matches!(err, ImagegenError::Validation(_)));
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("Newest".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert_eq!("oldest first".parse::<SortKey>().unwrap(), SortKey::Oldest);
        assert_eq!("model".parse::<SortKey>().unwrap(), SortKey::Model);
        assert!("size".parse::<SortKey>().is_err());
    }
}
