//! Gallery command - browse stored images

use anyhow::{Context, Result};
use colored::Colorize;
use imagegen_core::{GalleryIndexer, GalleryPage, GalleryRecord, SortKey};

use crate::config::SettingsManager;

pub struct GalleryOptions {
    pub page: usize,
    pub page_size: Option<usize>,
    pub sort: SortKey,
    pub json: bool,
}

pub async fn execute(options: GalleryOptions) -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;
    let page_size = options.page_size.unwrap_or(settings.page_size);

    let indexer = GalleryIndexer::new(&settings.images_dir);
    let page = indexer.list_page(options.page, page_size, options.sort)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    render_page(&page, options.sort);
    Ok(())
}

pub fn render_page(page: &GalleryPage, sort: SortKey) {
    println!(
        "{} {}",
        "🖼️  Image Gallery".blue().bold(),
        format!("(sorted by {})", sort).dimmed()
    );
    println!();

    if page.total_records == 0 {
        println!("   {}", "No images found in the gallery.".yellow());
        println!("   Create one with: {}", "imagegen generate \"<prompt>\"".dimmed());
        return;
    }

    if page.records.is_empty() {
        println!("   {}", "No images on this page.".yellow());
    }

    let first_index = (page.page.saturating_sub(1)) * page.page_size;
    for (offset, record) in page.records.iter().enumerate() {
        render_record(first_index + offset + 1, record);
    }

    println!(
        "Page {} of {} {}",
        page.page.to_string().cyan(),
        page.total_pages.to_string().cyan(),
        format!("({} images)", page.total_records).dimmed()
    );
}

fn render_record(position: usize, record: &GalleryRecord) {
    println!("   [{}] {}", position, record.file_name.cyan());
    println!("       Prompt: {}", record.prompt_display());
    println!(
        "       Model: {}   Seed: {}",
        record.model_display(),
        record.seed_display()
    );
    println!(
        "       Created: {}",
        record
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}
