//! Generate command - request an image and store it in the gallery

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use imagegen_core::{ArtifactWriter, GenerationRequest, Settings, StoredArtifact, UNAVAILABLE};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::Client;
use crate::config::SettingsManager;

pub struct GenerateOptions {
    pub prompt: String,
    pub model: Option<String>,
    pub seed: Option<u64>,
}

pub async fn execute(options: GenerateOptions) -> Result<()> {
    if options.prompt.trim().is_empty() {
        println!("{}", "⚠️  Please enter a prompt.".yellow());
        return Ok(());
    }

    let settings = SettingsManager::load().context("Failed to load settings")?;
    let writer = build_writer(&settings)?;

    let model = options.model.unwrap_or_else(|| settings.default_model.clone());
    let request = GenerationRequest::new(options.prompt, model).with_seed(options.seed);

    let stored = generate_with_progress(&writer, &request).await?;
    print_outcome(&stored);
    Ok(())
}

/// Writer wired to the HTTP client; fails early when the token is missing
pub fn build_writer(settings: &Settings) -> Result<ArtifactWriter> {
    let client = Client::from_settings(settings)?;
    let registry = SettingsManager::models()?;
    Ok(ArtifactWriter::new(
        registry,
        Arc::new(client),
        settings.images_dir.clone(),
    ))
}

/// Run one generation behind a spinner
pub async fn generate_with_progress(
    writer: &ArtifactWriter,
    request: &GenerationRequest,
) -> Result<StoredArtifact> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "Generating image with {}... This may take a while.",
        request.model_name
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = writer.generate_and_store(request).await;
    spinner.finish_and_clear();

    Ok(result?)
}

pub fn print_outcome(stored: &StoredArtifact) {
    println!(
        "{} Image generated successfully and saved to {}",
        "✓".green(),
        stored.image_path.display().to_string().cyan()
    );
    match stored.resolved_seed {
        Some(seed) => println!("  Seed value: {}", seed.to_string().cyan()),
        None => println!("  Seed value: {}", UNAVAILABLE.dimmed()),
    }
}
