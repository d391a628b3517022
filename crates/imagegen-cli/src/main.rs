//! Imagegen CLI
//!
//! Generate images with hosted models and browse the local gallery.

mod api;
mod commands;
mod config;
mod state;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use imagegen_core::{ImagegenError, SortKey};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "imagegen")]
#[command(author, version, about = "Imagegen - generate images and browse your local gallery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a prompt and save it to the gallery
    Generate {
        /// Text prompt
        prompt: String,

        /// Model name (see `imagegen models`)
        #[arg(short, long)]
        model: Option<String>,

        /// Seed for reproducible results
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(0..=4_294_967_295))]
        seed: Option<u64>,
    },

    /// Browse stored images
    Gallery {
        /// Page number (starting at 1)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Images per page (defaults to the configured page size)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        page_size: Option<u64>,

        /// Sort order: newest, oldest or model
        #[arg(short, long, default_value = "newest")]
        sort: SortKey,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a gallery image to a directory
    Download {
        /// Image file name as shown in the gallery
        file_name: String,

        /// Destination directory (defaults to the current directory)
        #[arg(short, long)]
        to: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// List configured models
    Models,

    /// Interactive session: generate and browse in one place
    Studio,

    /// Diagnose credentials, models and the image store
    Doctor,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the directory images are stored in
    SetImagesDir { dir: PathBuf },
    /// Set the number of images per gallery page
    SetPageSize { size: usize },
    /// Set the model used when none is given
    SetDefaultModel { name: String },
    /// Show current configuration
    Show,
    /// Reset to default configuration
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::SettingsManager::load_env_file();
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "imagegen_cli=debug,imagegen_core=debug"
        } else {
            "imagegen_cli=info"
        })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting imagegen");

    let result = match cli.command {
        Commands::Generate {
            prompt,
            model,
            seed,
        } => {
            commands::generate::execute(commands::generate::GenerateOptions {
                prompt,
                model,
                seed,
            })
            .await
        }
        Commands::Gallery {
            page,
            page_size,
            sort,
            json,
        } => {
            commands::gallery::execute(commands::gallery::GalleryOptions {
                page,
                page_size: page_size.map(|s| s as usize),
                sort,
                json,
            })
            .await
        }
        Commands::Download {
            file_name,
            to,
            force,
        } => commands::download::execute(&file_name, to, force).await,
        Commands::Models => commands::models::list().await,
        Commands::Studio => commands::studio::execute().await,
        Commands::Doctor => commands::doctor::execute().await,
        Commands::Config { action } => match action {
            ConfigAction::SetImagesDir { dir } => commands::config::set_images_dir(dir).await,
            ConfigAction::SetPageSize { size } => commands::config::set_page_size(size).await,
            ConfigAction::SetDefaultModel { name } => {
                commands::config::set_default_model(&name).await
            }
            ConfigAction::Show => commands::config::show().await,
            ConfigAction::Reset => commands::config::reset().await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
        match e.downcast_ref::<ImagegenError>() {
            Some(err) if err.is_configuration() => {
                eprintln!("{}", format!("⚠️  {}", err).yellow());
            }
            _ => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }

    result
}
