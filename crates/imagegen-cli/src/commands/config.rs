//! Config command - Manage CLI configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imagegen_core::API_TOKEN_ENV;

use crate::config::SettingsManager;

/// Set the artifact store directory
pub async fn set_images_dir(dir: PathBuf) -> Result<()> {
    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.images_dir = dir;
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!(
        "{} Images directory set to: {}",
        "✓".green(),
        settings.images_dir.display().to_string().cyan()
    );
    Ok(())
}

/// Set how many images one gallery page shows
pub async fn set_page_size(size: usize) -> Result<()> {
    if size == 0 {
        anyhow::bail!("Page size must be greater than zero");
    }

    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.page_size = size;
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Page size set to: {}", "✓".green(), size.to_string().cyan());
    Ok(())
}

/// Set the model used when `--model` is not given
pub async fn set_default_model(name: &str) -> Result<()> {
    let registry = SettingsManager::models()?;
    registry.resolve(name)?;

    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.default_model = name.to_string();
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Default model set to: {}", "✓".green(), name.cyan());
    Ok(())
}

/// Show current configuration
pub async fn show() -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;

    println!("{}", "Imagegen Configuration".bold().underline());
    println!();

    println!("{}", "Generation:".cyan().bold());
    println!("  API URL:       {}", settings.api_base_url);
    println!("  Default model: {}", settings.default_model);
    let token = if SettingsManager::api_token().is_ok() {
        "set".green()
    } else {
        "not set".red()
    };
    println!("  {}: {}", API_TOKEN_ENV, token);
    println!();

    println!("{}", "Gallery:".cyan().bold());
    println!("  Images dir: {}", settings.images_dir.display());
    println!("  Page size:  {}", settings.page_size);
    println!();

    println!("{}", "Config Files:".cyan().bold());
    println!(
        "  Settings: {}",
        SettingsManager::settings_path()?.display().to_string().dimmed()
    );
    let home = SettingsManager::imagegen_home()?;
    match imagegen_core::ModelRegistry::find_model_file(&home) {
        Some(path) => println!("  Models:   {}", path.display().to_string().dimmed()),
        None => println!("  Models:   {}", "built-in".dimmed()),
    }

    Ok(())
}

/// Reset configuration to defaults
pub async fn reset() -> Result<()> {
    use dialoguer::Confirm;

    let confirm = Confirm::new()
        .with_prompt("Reset all settings to their defaults? Stored images are kept.")
        .default(false)
        .interact()?;

    if !confirm {
        println!("{}", "Reset cancelled.".yellow());
        return Ok(());
    }

    SettingsManager::save(&imagegen_core::Settings::default())
        .context("Failed to save default settings")?;

    println!("{} Configuration reset to defaults.", "✓".green());
    Ok(())
}
