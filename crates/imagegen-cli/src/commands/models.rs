//! Models command - list configured models

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::SettingsManager;

pub async fn list() -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;
    let registry = SettingsManager::models()?;

    println!("{}", "🔧 Models".blue().bold());
    println!();

    for model in registry.all() {
        let marker = if model.name == settings.default_model { "*" } else { " " };
        let name = if model.disabled {
            format!("{} ⚠️  (disabled)", model.name).yellow()
        } else {
            model.name.cyan()
        };
        println!("   [{}] {} - {}", marker, name, model.endpoint.dimmed());

        for (key, value) in &model.parameters {
            println!("       {}: {}", key, value.to_string().dimmed());
        }
    }

    Ok(())
}
