//! Model configuration for Imagegen
//!
//! The registry is built once at startup, from the built-in table or from a
//! `models.yaml`/`models.json` override, and is never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ImagegenError, Result};
use crate::types::{ModelConfig, ParamValue, IMAGE_EXTENSIONS, RESERVED_PARAMETERS};

/// Model table file names to search for
pub const MODEL_FILE_NAMES: &[&str] = &["models.yaml", "models.yml", "models.json"];

/// Name of the model selected when the user does not pick one
pub const DEFAULT_MODEL: &str = "schnell";

/// Environment variable holding the generation service token
pub const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "https://api.replicate.com/v1";

/// User settings persisted as `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    /// Artifact store; relative paths resolve against the working directory
    pub images_dir: PathBuf,
    pub page_size: usize,
    pub default_model: String,
    pub api_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            images_dir: PathBuf::from("images"),
            page_size: crate::gallery::DEFAULT_PAGE_SIZE,
            default_model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelFile {
    models: Vec<ModelConfig>,
}

/// Immutable, ordered set of model configurations
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelConfig>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    /// Create a registry, rejecting duplicate names and reserved parameters
    pub fn new(models: Vec<ModelConfig>) -> Result<Self> {
        validate_models(&models)?;
        Ok(Self { models })
    }

    /// The built-in model table
    pub fn builtin() -> Self {
        let schnell = ModelConfig::new("schnell", "black-forest-labs/flux-schnell")
            .with_param("num_outputs", ParamValue::Int(1))
            .with_param("aspect_ratio", ParamValue::String("1:1".into()))
            .with_param("output_format", ParamValue::String("webp".into()))
            .with_param("output_quality", ParamValue::Int(90));

        let flux_dev = ModelConfig::new("flux-dev", "black-forest-labs/flux-dev")
            .with_param("guidance", ParamValue::Float(3.5))
            .with_param("num_outputs", ParamValue::Int(1))
            .with_param("aspect_ratio", ParamValue::String("1:1".into()))
            .with_param("output_format", ParamValue::String("webp".into()))
            .with_param("output_quality", ParamValue::Int(80))
            .with_param("prompt_strength", ParamValue::Float(0.8))
            .with_param("num_inference_steps", ParamValue::Int(50))
            .disabled();

        Self {
            models: vec![schnell, flux_dev],
        }
    }

    /// Find a model table file in a directory
    pub fn find_model_file(dir: &Path) -> Option<PathBuf> {
        MODEL_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load a model table from a YAML or JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ModelFile = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Self::new(file.models)
    }

    /// Load the override table from `dir` if present, otherwise the built-in one
    pub fn load_from_directory(dir: &Path) -> Result<Self> {
        match Self::find_model_file(dir) {
            Some(path) => {
                tracing::debug!("Loading model table from {:?}", path);
                Self::load(&path)
            }
            None => Ok(Self::builtin()),
        }
    }

    /// Look up a model, failing on unknown or disabled entries
    pub fn resolve(&self, name: &str) -> Result<&ModelConfig> {
        let model = self.get(name).ok_or_else(|| {
            ImagegenError::Configuration(format!(
                "Unknown model '{}'. Available: {}",
                name,
                self.names().join(", ")
            ))
        })?;

        if model.disabled {
            return Err(ImagegenError::ModelDisabled(model.name.clone()));
        }
        Ok(model)
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter().filter(|m| !m.disabled)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn validate_models(models: &[ModelConfig]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for model in models {
        if model.name.trim().is_empty() {
            return Err(ImagegenError::Configuration(
                "Model name must not be empty".to_string(),
            ));
        }
        if model.endpoint.trim().is_empty() {
            return Err(ImagegenError::Configuration(format!(
                "Model '{}' has no endpoint",
                model.name
            )));
        }
        if !seen.insert(model.name.as_str()) {
            return Err(ImagegenError::Configuration(format!(
                "Duplicate model name: {}",
                model.name
            )));
        }
        for key in RESERVED_PARAMETERS {
            if model.parameters.contains_key(*key) {
                return Err(ImagegenError::Configuration(format!(
                    "Model '{}' must not set '{}' in its parameters; it is supplied per request",
                    model.name, key
                )));
            }
        }
        if let Some(value) = model.parameters.get("output_format") {
            let known = match value {
                ParamValue::String(f) => IMAGE_EXTENSIONS.contains(&f.to_ascii_lowercase().as_str()),
                _ => false,
            };
            if !known {
                return Err(ImagegenError::Configuration(format!(
                    "Model '{}' has output_format '{}'; expected one of {}",
                    model.name,
                    value,
                    IMAGE_EXTENSIONS.join(", ")
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"page_size": 12}"#).unwrap();
        assert_eq!(settings.page_size, 12);
        assert_eq!(settings.images_dir, PathBuf::from("images"));
        assert_eq!(settings.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_builtin_resolves_schnell() {
        let registry = ModelRegistry::builtin();
        let model = registry.resolve("schnell").unwrap();
        assert_eq!(model.endpoint, "black-forest-labs/flux-schnell");
        assert_eq!(model.output_format(), Some("webp"));
    }

    #[test]
    fn test_disabled_model_is_flagged() {
        let registry = ModelRegistry::builtin();
        let err = registry.resolve("flux-dev").unwrap_err();
        assert!(matches!(err, ImagegenError::ModelDisabled(ref name) if name == "flux-dev"));
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let err = ModelRegistry::builtin().resolve("sdxl").unwrap_err();
        assert!(matches!(err, ImagegenError::Configuration(_)));
        assert!(err.to_string().contains("schnell"));
    }

    #[test]
    fn test_reserved_parameter_rejected() {
        let model = ModelConfig::new("bad", "owner/bad")
            .with_param("seed", ParamValue::Int(7));
        let err = ModelRegistry::new(vec![model]).unwrap_err();
        assert!(err.to_string().contains("seed"));
    }

    #[test]
    fn test_unlisted_output_format_rejected() {
        let tiffy = ModelConfig::new("tiffy", "owner/tiffy")
            .with_param("output_format", ParamValue::String("tiff".into()));
        let err = ModelRegistry::new(vec![tiffy]).unwrap_err();
        assert!(matches!(err, ImagegenError::Configuration(_)));
        assert!(err.to_string().contains("tiff"));

        let upper = ModelConfig::new("upper", "owner/upper")
            .with_param("output_format", ParamValue::String("PNG".into()));
        assert!(ModelRegistry::new(vec![upper]).is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let a = ModelConfig::new("a", "owner/a");
        let err = ModelRegistry::new(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, ImagegenError::Configuration(_)));
    }

    #[test]
    fn test_load_yaml_override() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let content = r#"
models:
  - name: turbo
    endpoint: owner/turbo
    parameters:
      output_format: png
      num_outputs: 1
  - name: legacy
    endpoint: owner/legacy
    disabled: true
"#;
        std::fs::write(dir.path().join("models.yaml"), content)?;

        let registry = ModelRegistry::load_from_directory(dir.path())?;
        assert_eq!(registry.names(), vec!["turbo", "legacy"]);
        assert_eq!(registry.resolve("turbo")?.output_format(), Some("png"));
        assert_eq!(registry.enabled().count(), 1);
        Ok(())
    }

    #[test]
    fn test_load_from_empty_directory_uses_builtin() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = ModelRegistry::load_from_directory(dir.path())?;
        assert_eq!(registry.len(), 2);
        Ok(())
    }
}
