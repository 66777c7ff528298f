use crate::error::Result;
use crate::utils::image_extension;
use futures::StreamExt;
use reqwest::Response;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const PAGE_PREFIX: &str = "manga_";

/// Owns the directory that downloaded page images are written to.
#[derive(Debug, Clone)]
pub struct StorageManager {
    images_dir: PathBuf,
}

impl StorageManager {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Deterministic location of a page image: `manga_<page id>.<ext>`.
    pub fn page_image_path(&self, page_id: &str, url: &str) -> PathBuf {
        let filename = format!(
            "{}{}.{}",
            PAGE_PREFIX,
            self.sanitize_filename(page_id),
            image_extension(url)
        );
        self.images_dir.join(filename)
    }

    /// Streams the response body to `path`. A partially written file is
    /// removed when the body or the write fails.
    pub async fn write_response(&self, response: Response, path: &Path) -> Result<u64> {
        tokio::fs::create_dir_all(&self.images_dir).await?;

        match Self::stream_to_file(response, path).await {
            Ok(written) => {
                debug!("[STORAGE] Wrote {} bytes to {:?}", written, path);
                Ok(written)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(path).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("[STORAGE] Could not remove partial file {:?}: {}", path, remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| std::io::Error::other(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }

    /// Deletes every downloaded page image and returns how many were removed.
    pub async fn remove_downloaded_pages(&self) -> Result<usize> {
        if !self.images_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(&self.images_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_page = entry.file_name().to_string_lossy().starts_with(PAGE_PREFIX);
            if is_page && entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        info!("[STORAGE] Removed {} page images from {:?}", removed, self.images_dir);
        Ok(removed)
    }

    /// Filename-safe form of a page id. ASCII letters, digits and `-` are
    /// kept; every other byte becomes `_xx` (lowercase hex), so distinct ids
    /// always map to distinct names and none can leave the directory.
    fn sanitize_filename(&self, filename: &str) -> String {
        let mut sanitized = String::with_capacity(filename.len());
        for byte in filename.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                sanitized.push(char::from(byte));
            } else {
                sanitized.push_str(&format!("_{:02x}", byte));
            }
        }
        sanitized
    }
}
