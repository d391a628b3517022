//! Doctor command - Diagnostics

use anyhow::Result;
use colored::Colorize;
use imagegen_core::{GalleryIndexer, API_TOKEN_ENV};

use crate::config::SettingsManager;

pub async fn execute() -> Result<()> {
    println!("{}", "🔍 Imagegen Diagnostics".blue().bold());
    println!();

    println!("{}", "Credentials:".cyan());
    if SettingsManager::api_token().is_ok() {
        println!("   {} {} is set", "✓".green(), API_TOKEN_ENV);
    } else {
        println!("   {} {} is not set", "✗".red(), API_TOKEN_ENV);
        println!("      Run: {}", format!("export {}=<token>", API_TOKEN_ENV).dimmed());
    }
    println!();

    println!("{}", "Models:".cyan());
    let settings = match SettingsManager::load() {
        Ok(settings) => Some(settings),
        Err(e) => {
            println!("   {} Failed to load settings: {}", "✗".red(), e);
            None
        }
    };
    match SettingsManager::models() {
        Ok(registry) => {
            println!(
                "   {} {} model(s) configured, {} enabled",
                "✓".green(),
                registry.len(),
                registry.enabled().count()
            );
            if let Some(ref settings) = settings {
                match registry.resolve(&settings.default_model) {
                    Ok(_) => println!("   {} Default model '{}' is usable", "✓".green(), settings.default_model),
                    Err(e) => println!("   {} {}", "✗".red(), e),
                }
            }
        }
        Err(e) => println!("   {} {:#}", "✗".red(), e),
    }
    println!();

    println!("{}", "Gallery:".cyan());
    if let Some(settings) = settings {
        let dir = &settings.images_dir;
        if dir.is_dir() {
            match GalleryIndexer::new(dir).scan() {
                Ok(records) => println!(
                    "   {} {} image(s) in {}",
                    "✓".green(),
                    records.len(),
                    dir.display().to_string().dimmed()
                ),
                Err(e) => println!("   {} Failed to read {}: {}", "✗".red(), dir.display(), e),
            }
        } else {
            println!(
                "   {} {} does not exist yet (created on first generation)",
                "•".yellow(),
                dir.display()
            );
        }
    }
    println!();

    println!("{}", "Done!".green().bold());

    Ok(())
}
