//! Artifact writer
//!
//! Turns a generation request into an image file plus its JSON sidecar in
//! the store directory. The image is written first; a crash before the
//! sidecar lands leaves an image without metadata, which the gallery
//! tolerates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ModelRegistry;
use crate::error::{ImagegenError, Result};
use crate::naming;
use crate::service::GenerationService;
use crate::types::{
    ArtifactMetadata, GenerationRequest, GenerationResult, ModelConfig, StoredArtifact,
    IMAGE_EXTENSIONS, METADATA_EXTENSION,
};

/// Format used when neither the model nor the output URL names one
pub const FALLBACK_OUTPUT_FORMAT: &str = "png";

/// Attempts at drawing an unused base name before giving up
const MAX_NAME_ATTEMPTS: usize = 8;

pub struct ArtifactWriter {
    registry: ModelRegistry,
    service: Arc<dyn GenerationService>,
    store_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(
        registry: ModelRegistry,
        service: Arc<dyn GenerationService>,
        store_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            service,
            store_dir: store_dir.into(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Generate an image and persist it as an artifact pair
    pub async fn generate_and_store(&self, request: &GenerationRequest) -> Result<StoredArtifact> {
        let result = self.generate(request).await?;
        let now = chrono::Local::now().naive_local();
        self.store(request, &result, now).await
    }

    /// Call the service and download the image without touching the store
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        let model = self.registry.resolve(&request.model_name)?;

        let payload = model.build_payload(&request.prompt, request.seed);
        info!(
            "Generating image with model '{}' ({})",
            model.name, model.endpoint
        );
        debug!("Payload: {:?}", payload);

        let response = self.service.run(&model.endpoint, payload).await?;
        let image_url = response.first_output()?.to_string();
        let resolved_seed = response.resolve_seed(request.seed);
        debug!("Output reference: {}, seed: {:?}", image_url, resolved_seed);

        let image_bytes = self.service.fetch(&image_url).await?;
        if image_bytes.is_empty() {
            return Err(ImagegenError::UpstreamFormat(format!(
                "image at {} is empty",
                image_url
            )));
        }

        Ok(GenerationResult {
            image_bytes,
            resolved_seed,
            output_format: resolve_output_format(model, &image_url),
        })
    }

    /// Write the image, then its sidecar, under a fresh base name
    pub async fn store(
        &self,
        request: &GenerationRequest,
        result: &GenerationResult,
        now: NaiveDateTime,
    ) -> Result<StoredArtifact> {
        tokio::fs::create_dir_all(&self.store_dir).await?;

        let (image_path, metadata_path) = self
            .write_image(&result.image_bytes, &result.output_format, now)
            .await?;

        let metadata = ArtifactMetadata {
            prompt: request.prompt.clone(),
            model_name: request.model_name.clone(),
            seed: result.resolved_seed,
        };
        let content = serde_json::to_vec_pretty(&metadata)?;
        tokio::fs::write(&metadata_path, content).await?;

        info!("Saved {:?}", image_path);
        Ok(StoredArtifact {
            image_path,
            metadata_path,
            resolved_seed: result.resolved_seed,
        })
    }

    async fn write_image(
        &self,
        bytes: &[u8],
        format: &str,
        now: NaiveDateTime,
    ) -> Result<(PathBuf, PathBuf)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let base = naming::new_base_name(now);
            let image_path = self.store_dir.join(format!("{}.{}", base, format));
            let metadata_path = self
                .store_dir
                .join(format!("{}.{}", base, METADATA_EXTENSION));

            // An orphaned sidecar would otherwise be adopted by the new image
            if tokio::fs::try_exists(&metadata_path).await? {
                warn!("Base name {} already has a sidecar, drawing another", base);
                continue;
            }

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&image_path)
                .await;

            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    warn!("Base name {} is taken, drawing another", base);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            file.write_all(bytes).await?;
            file.flush().await?;
            return Ok((image_path, metadata_path));
        }

        Err(ImagegenError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "could not find a free artifact name in {:?}",
                self.store_dir
            ),
        )))
    }
}

/// Pick the file extension for a generated image
pub fn resolve_output_format(model: &ModelConfig, image_url: &str) -> String {
    let configured = model
        .output_format()
        .map(|f| f.to_ascii_lowercase())
        .filter(|f| IMAGE_EXTENSIONS.contains(&f.as_str()));
    if let Some(format) = configured {
        return format;
    }
    url_extension(image_url)
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| FALLBACK_OUTPUT_FORMAT.to_string())
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let last_segment = path.rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeService;
    use crate::types::ParamValue;

    fn writer(service: Arc<FakeService>, dir: &Path) -> ArtifactWriter {
        ArtifactWriter::new(ModelRegistry::builtin(), service, dir)
    }

    fn read_metadata(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_generate_and_store_writes_pair() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!(["https://cdn/out-0.webp"])));
        let writer = writer(service.clone(), dir.path());

        let stored = writer
            .generate_and_store(&GenerationRequest::new("a red fox", "schnell"))
            .await?;

        assert!(stored.image_path.exists());
        assert_eq!(stored.image_path.extension().unwrap(), "webp");
        assert_eq!(stored.metadata_path.with_extension("webp"), stored.image_path);
        assert_eq!(stored.resolved_seed, None);

        let meta = read_metadata(&stored.metadata_path);
        assert_eq!(meta["prompt"], "a red fox");
        assert_eq!(meta["model_name"], "schnell");
        assert!(meta["seed"].is_null());

        let payloads = service.payloads.lock().unwrap();
        assert!(!payloads[0].contains_key("seed"));
        assert_eq!(payloads[0]["output_format"], "webp");
        Ok(())
    }

    #[tokio::test]
    async fn test_supplied_seed_is_stored_verbatim() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!({
            "output": ["https://cdn/out-0.webp"],
            "logs": "Using seed: 555",
        })));
        let writer = writer(service.clone(), dir.path());

        let request = GenerationRequest::new("a red fox", "schnell").with_seed(Some(42));
        let stored = writer.generate_and_store(&request).await?;

        assert_eq!(stored.resolved_seed, Some(42));
        assert_eq!(read_metadata(&stored.metadata_path)["seed"], 42);
        assert_eq!(service.payloads.lock().unwrap()[0]["seed"], 42);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_parsed_from_logs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!({
            "output": ["https://cdn/out-0.webp"],
            "logs": "Using seed: 12345\nInference done",
        })));
        let stored = writer(service, dir.path())
            .generate_and_store(&GenerationRequest::new("a red fox", "schnell"))
            .await?;

        assert_eq!(stored.resolved_seed, Some(12345));
        assert_eq!(read_metadata(&stored.metadata_path)["seed"], 12345);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_model_never_calls_service() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!(["https://cdn/x.webp"])));
        let err = writer(service.clone(), dir.path())
            .generate_and_store(&GenerationRequest::new("a red fox", "flux-dev"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImagegenError::ModelDisabled(_)));
        assert!(service.payloads.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unrecognized_response_leaves_store_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!({"output": []})));
        let err = writer(service, dir.path())
            .generate_and_store(&GenerationRequest::new("a red fox", "schnell"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImagegenError::UpstreamFormat(_)));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!(["https://cdn/x.webp"])).failing_fetch());
        let err = writer(service, dir.path())
            .generate_and_store(&GenerationRequest::new("a red fox", "schnell"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImagegenError::UpstreamFetch { status: 404, .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_same_second_writes_get_distinct_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let service = Arc::new(FakeService::new(serde_json::json!(["https://cdn/x.webp"])));
        let writer = writer(service, dir.path());
        let request = GenerationRequest::new("a red fox", "schnell");
        let result = writer.generate(&request).await?;
        let now = chrono::Local::now().naive_local();

        let a = writer.store(&request, &result, now).await?;
        let b = writer.store(&request, &result, now).await?;

        assert_ne!(a.image_path, b.image_path);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 4);
        Ok(())
    }

    #[test]
    fn test_output_format_resolution() {
        let with_format = ModelConfig::new("m", "o/m")
            .with_param("output_format", ParamValue::String("JPG".into()));
        assert_eq!(resolve_output_format(&with_format, "https://x/a.png"), "jpg");

        let bare = ModelConfig::new("m", "o/m");
        assert_eq!(resolve_output_format(&bare, "https://x/a.webp?sig=1"), "webp");
        assert_eq!(resolve_output_format(&bare, "https://x/output"), "png");
        assert_eq!(resolve_output_format(&bare, "https://x/a.tar.gz"), "png");

        // the gallery would never list a .tiff
        let tiff = ModelConfig::new("m", "o/m")
            .with_param("output_format", ParamValue::String("tiff".into()));
        assert_eq!(resolve_output_format(&tiff, "https://x/a.webp"), "webp");
        assert_eq!(resolve_output_format(&tiff, "https://x/a.tiff"), "png");
    }

    #[tokio::test]
    async fn test_store_dir_that_is_a_file_fails_cleanly() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("images");
        std::fs::write(&blocker, b"not a directory")?;

        let service = Arc::new(FakeService::new(serde_json::json!(["https://cdn/x.webp"])));
        let err = writer(service, &blocker)
            .generate_and_store(&GenerationRequest::new("a red fox", "schnell"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImagegenError::Io(_)));
        let entries: Vec<_> = std::fs::read_dir(dir.path())?
            .map(|e| e.map(|e| e.file_name()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(entries, vec![std::ffi::OsString::from("images")]);
        Ok(())
    }
}
