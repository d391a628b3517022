//! Generation service boundary
//!
//! The remote service is reached through [`GenerationService`]. Its response
//! arrives in one of two shapes and is decoded once, here, into
//! [`ServiceResponse`].

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ImagegenError, Result};

static SEED_ANNOUNCEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bseed\s*[:=]\s*(\d+)").expect("valid seed regex"));

/// Remote image generation service
///
/// Implemented over HTTP by the CLI; tests provide in-memory fakes.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Run a model with the given input payload and wait for its result
    async fn run(
        &self,
        endpoint: &str,
        input: serde_json::Map<String, Value>,
    ) -> Result<ServiceResponse>;

    /// Download the bytes behind an output reference
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Decoded response of the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceResponse {
    /// A bare ordered list of output references
    DirectOutputs(Vec<String>),
    /// A prediction-like object with outputs and optional log text
    StructuredOutput {
        outputs: Vec<String>,
        logs: Option<String>,
    },
}

impl ServiceResponse {
    /// Decode a raw JSON response
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(ServiceResponse::DirectOutputs(string_items(items))),
            Value::String(s) => Ok(ServiceResponse::DirectOutputs(vec![s])),
            Value::Object(mut map) => {
                let output = map.remove("output").ok_or_else(|| {
                    ImagegenError::UpstreamFormat("response object has no 'output' field".into())
                })?;
                let outputs = match output {
                    Value::Array(items) => string_items(items),
                    Value::String(s) => vec![s],
                    Value::Null => Vec::new(),
                    other => {
                        return Err(ImagegenError::UpstreamFormat(format!(
                            "unsupported 'output' value: {}",
                            other
                        )))
                    }
                };
                let logs = match map.remove("logs") {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                };
                Ok(ServiceResponse::StructuredOutput { outputs, logs })
            }
            other => Err(ImagegenError::UpstreamFormat(format!(
                "expected a list or an object, got: {}",
                other
            ))),
        }
    }

    pub fn outputs(&self) -> &[String] {
        match self {
            ServiceResponse::DirectOutputs(outputs) => outputs,
            ServiceResponse::StructuredOutput { outputs, .. } => outputs,
        }
    }

    pub fn logs(&self) -> Option<&str> {
        match self {
            ServiceResponse::DirectOutputs(_) => None,
            ServiceResponse::StructuredOutput { logs, .. } => logs.as_deref(),
        }
    }

    /// The first output reference; absent or empty is a format error
    pub fn first_output(&self) -> Result<&str> {
        self.outputs()
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ImagegenError::UpstreamFormat("no image URL found in the model output".into()))
    }

    /// Seed attributed to this result. A caller-supplied seed always wins.
    pub fn resolve_seed(&self, supplied: Option<u64>) -> Option<u64> {
        supplied.or_else(|| self.logs().and_then(parse_seed_from_logs))
    }
}

fn string_items(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Extract the seed from log text such as `Using seed: 12345`
pub fn parse_seed_from_logs(logs: &str) -> Option<u64> {
    SEED_ANNOUNCEMENT
        .captures(logs)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
