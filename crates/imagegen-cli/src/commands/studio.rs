//! Studio command - interactive generation and gallery browsing

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Select};
use imagegen_core::{
    ArtifactWriter, GalleryIndexer, GalleryPage, GenerationRequest, ImagegenError, SortKey,
    UNAVAILABLE,
};

use super::{download, gallery, generate};
use crate::config::SettingsManager;
use crate::state::StudioState;

const ACTIONS: &[&str] = &[
    "Generate image",
    "Next page",
    "Previous page",
    "Go to page",
    "Change sort order",
    "Download image",
    "Share image link",
    "Quit",
];

pub async fn execute() -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;
    let writer = generate::build_writer(&settings)?;
    let indexer = GalleryIndexer::new(&settings.images_dir);
    let mut state = StudioState::new(settings.page_size);

    loop {
        let page = indexer.list_page(state.page, state.page_size, state.sort)?;
        println!();
        gallery::render_page(&page, state.sort);
        show_last_generated(&state);

        let selection = Select::new()
            .with_prompt("What would you like to do?")
            .items(ACTIONS)
            .default(0)
            .interact()?;

        state = match selection {
            0 => handle_generate(state, &writer, &settings.default_model).await?,
            1 => state.next_page(page.total_pages),
            2 => state.prev_page(),
            3 => handle_go_to(state, page.total_pages)?,
            4 => handle_sort(state)?,
            5 => handle_download(state, &page).await?,
            6 => handle_share(state, &page)?,
            _ => break,
        };
    }

    Ok(())
}

fn show_last_generated(state: &StudioState) {
    if let Some(ref last) = state.last_generated {
        let seed = last
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string());
        println!(
            "Last generated: {} (Seed: {})",
            last.image_path.display().to_string().cyan(),
            seed
        );
    }
}

async fn handle_generate(
    state: StudioState,
    writer: &ArtifactWriter,
    default_model: &str,
) -> Result<StudioState> {
    let models: Vec<_> = writer.registry().all().collect();
    let labels: Vec<String> = models
        .iter()
        .map(|m| {
            if m.disabled {
                format!("{} ⚠️", m.name)
            } else {
                m.name.clone()
            }
        })
        .collect();
    let default_index = models
        .iter()
        .position(|m| m.name == default_model)
        .unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Select model")
        .items(&labels)
        .default(default_index)
        .interact()?;
    let model_name = models[choice].name.clone();

    let seed_text: String = Input::new()
        .with_prompt("Seed (optional)")
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            parse_seed(input).map(|_| ())
        })
        .interact_text()?;
    let seed = parse_seed(&seed_text).map_err(anyhow::Error::msg)?;

    let prompt: String = Input::new()
        .with_prompt("Enter your prompt")
        .allow_empty(true)
        .interact_text()?;
    if prompt.trim().is_empty() {
        println!("{}", "⚠️  Please enter a prompt.".yellow());
        return Ok(state);
    }

    let request = GenerationRequest::new(prompt, model_name).with_seed(seed);
    match generate::generate_with_progress(writer, &request).await {
        Ok(stored) => {
            generate::print_outcome(&stored);
            Ok(state.with_generated(&stored))
        }
        Err(e) => {
            match e.downcast_ref::<ImagegenError>() {
                Some(err @ ImagegenError::ModelDisabled(_)) => {
                    println!("{}", format!("⚠️  {}", err).yellow())
                }
                _ => println!("{} An error occurred: {}", "✗".red(), e),
            }
            Ok(state)
        }
    }
}

/// Print an absolute `file://` link to a stored image for pasting elsewhere
fn handle_share(state: StudioState, page: &GalleryPage) -> Result<StudioState> {
    let Some(path) = pick_image(page, "Share which image?")? else {
        return Ok(state);
    };

    match share_link(&path) {
        Ok(link) => {
            println!("{} Image link:", "✓".green());
            println!("   {}", link.cyan());
        }
        Err(e) => println!("{} {:#}", "✗".red(), e),
    }
    Ok(state)
}

fn share_link(path: &std::path::Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {:?}", path))?;
    Ok(format!("file://{}", absolute.display()))
}

fn pick_image(page: &GalleryPage, prompt: &str) -> Result<Option<PathBuf>> {
    if page.records.is_empty() {
        println!("{}", "No images on this page.".yellow());
        return Ok(None);
    }

    let names: Vec<&str> = page.records.iter().map(|r| r.file_name.as_str()).collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&names)
        .default(0)
        .interact()?;
    Ok(Some(page.records[choice].file_path.clone()))
}

/// Empty means "let the service choose"
fn parse_seed(input: &str) -> std::result::Result<Option<u64>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<u32>() {
        Ok(seed) => Ok(Some(u64::from(seed))),
        Err(_) => Err(format!("Seed must be a whole number between 0 and {}", u32::MAX)),
    }
}

fn handle_go_to(state: StudioState, total_pages: usize) -> Result<StudioState> {
    let page: usize = Input::new()
        .with_prompt(format!("Page (1-{})", total_pages))
        .default(state.page)
        .interact_text()?;
    Ok(state.go_to(page, total_pages))
}

fn handle_sort(state: StudioState) -> Result<StudioState> {
    let keys = SortKey::all();
    let labels = ["Newest first", "Oldest first", "Model name"];
    let current = keys.iter().position(|k| *k == state.sort).unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Sort by")
        .items(&labels)
        .default(current)
        .interact()?;
    Ok(state.with_sort(keys[choice]))
}

async fn handle_download(state: StudioState, page: &GalleryPage) -> Result<StudioState> {
    let Some(source) = pick_image(page, "Download which image?")? else {
        return Ok(state);
    };

    let dest: String = Input::new()
        .with_prompt("Destination directory")
        .default(".".to_string())
        .interact_text()?;

    match download::copy_image(&source, &PathBuf::from(dest), false).await {
        Ok(path) => println!("{} Downloaded to {}", "✓".green(), path.display().to_string().cyan()),
        Err(e) => println!("{} {:#}", "✗".red(), e),
    }
    Ok(state)
}
