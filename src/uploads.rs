use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{ServiceError, ServiceResult};
use crate::models;

/// File extension for a supported image mimetype.
pub fn image_extension(mimetype: &str) -> Option<&'static str> {
    match mimetype.to_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/svg" | "image/svg+xml" => Some("svg"),
        _ => None,
    }
}

fn generate_file_stem() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Cafe images on disk. Stored files are referenced by their file name only.
#[derive(Debug, Clone)]
pub struct ImageStore {
    directory: PathBuf,
}

impl ImageStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn init(&self) -> ServiceResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        info!("Storing uploaded images in {:?}", self.directory);
        Ok(())
    }

    /// Write `image` to a new file and return its file name.
    pub async fn store(&self, image: &models::Image) -> ServiceResult<String> {
        let extension = image_extension(&image.mimetype).ok_or_else(|| {
            ServiceError::BadRequest(format!("Unsupported image type '{}'", image.mimetype))
        })?;

        let filename = format!("{}.{}", generate_file_stem(), extension);
        tokio::fs::write(self.directory.join(&filename), &image.data).await?;

        Ok(filename)
    }

    /// Remove a previously stored file. Failures are only logged.
    pub async fn remove(&self, filename: &str) {
        // refuse anything that could escape the upload directory
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.starts_with('.')
        {
            warn!("Refusing to remove image with suspicious name {:?}", filename);
            return;
        }

        if let Err(e) = tokio::fs::remove_file(self.directory.join(filename)).await {
            warn!("Could not remove image {:?}: {:?}", filename, e);
        }
    }
}
