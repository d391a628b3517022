//! Download command - copy a gallery image out of the store

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use imagegen_core::GalleryIndexer;

use crate::config::SettingsManager;

pub async fn execute(file_name: &str, to: Option<PathBuf>, force: bool) -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;
    let indexer = GalleryIndexer::new(&settings.images_dir);
    let source = indexer.locate(file_name)?;

    let dest_dir = match to {
        Some(dir) => dir,
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let dest = copy_image(&source, &dest_dir, force).await?;

    println!(
        "{} Downloaded {} to {}",
        "✓".green(),
        file_name.cyan(),
        dest.display().to_string().cyan()
    );
    Ok(())
}

/// Copy `source` into `dest_dir` under the same file name
pub async fn copy_image(source: &std::path::Path, dest_dir: &std::path::Path, force: bool) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .context("Image path has no file name")?;
    let dest = dest_dir.join(file_name);

    if dest == source {
        anyhow::bail!("Destination is the image itself: {:?}", dest);
    }
    if dest.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", dest);
    }

    tokio::fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("Failed to create directory {:?}", dest_dir))?;
    tokio::fs::copy(source, &dest)
        .await
        .with_context(|| format!("Failed to copy {:?} to {:?}", source, dest))?;

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_image_refuses_overwrite() -> Result<()> {
        let store = tempfile::tempdir()?;
        let out = tempfile::tempdir()?;
        let source = store.path().join("a.png");
        std::fs::write(&source, b"png")?;

        let dest = copy_image(&source, out.path(), false).await?;
        assert_eq!(std::fs::read(&dest)?, b"png");

        assert!(copy_image(&source, out.path(), false).await.is_err());
        assert!(copy_image(&source, out.path(), true).await.is_ok());
        assert!(copy_image(&source, store.path(), true).await.is_err());
        Ok(())
    }
}
