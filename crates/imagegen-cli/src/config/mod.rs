//! Configuration management

use anyhow::{Context, Result};
use imagegen_core::{ModelRegistry, Settings, API_TOKEN_ENV};
use std::path::PathBuf;

pub struct SettingsManager;

impl SettingsManager {
    /// Get the imagegen home directory (~/.imagegen)
    pub fn imagegen_home() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("IMAGEGEN_HOME") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".imagegen"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::imagegen_home()?.join("settings.json"))
    }

    /// Load settings from disk, writing defaults on first run
    pub fn load() -> Result<Settings> {
        let path = Self::settings_path()?;

        if !path.exists() {
            let settings = Settings::default();
            Self::save(&settings)?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        if settings.page_size == 0 {
            anyhow::bail!("Invalid page_size 0 in {:?}", path);
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(settings: &Settings) -> Result<()> {
        let path = Self::settings_path()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Model table from `~/.imagegen/models.yaml`, or the built-in one
    pub fn models() -> Result<ModelRegistry> {
        let home = Self::imagegen_home()?;
        ModelRegistry::load_from_directory(&home).context("Failed to load model table")
    }

    /// Load variables from a `.env` file in the working directory or a parent.
    /// Values already set in the process environment win.
    pub fn load_env_file() {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => eprintln!("Warning: ignoring unreadable .env file: {}", e),
        }
    }

    /// The generation service token, read from the environment
    pub fn api_token() -> Result<String> {
        match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(imagegen_core::ImagegenError::MissingCredential(API_TOKEN_ENV.to_string()).into()),
        }
    }
}
