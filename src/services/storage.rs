//! Local disk storage for image files.
//!
//! Files live flat in the upload directory. Each upload gets a fresh file
//! name derived from the image key, a random suffix and the detected
//! format, so client supplied names never become paths.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Longest prefix of the image key kept in a storage file name.
const MAX_KEY_PREFIX_LEN: usize = 64;

/// Image file store rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
    max_upload_size: usize,
}

impl ImageStorage {
    /// Create the storage, making sure the upload directory exists.
    pub async fn new(settings: &StorageSettings) -> AppResult<Self> {
        tokio::fs::create_dir_all(&settings.upload_dir)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create upload directory {}: {}",
                    settings.upload_dir.display(),
                    e
                ))
            })?;

        info!("Image storage initialized: {}", settings.upload_dir.display());

        Ok(Self {
            root: settings.upload_dir.clone(),
            max_upload_size: settings.max_upload_size,
        })
    }

    /// Directory holding the stored files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Largest accepted upload in bytes.
    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// Fresh storage file name for an upload of `image_key`.
    ///
    /// Format: `{sanitized key prefix}-{16 hex chars of sha256(key)}-{uuid}.{ext}`.
    /// Every call returns a new name, so concurrent uploads of one key never
    /// share a file.
    pub fn new_file_name(image_key: &str, format: ImageFormat) -> String {
        let sanitized: String = image_key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_KEY_PREFIX_LEN)
            .collect();

        let digest = hex::encode(Sha256::digest(image_key.as_bytes()));

        format!(
            "{}-{}-{}.{}",
            sanitized,
            &digest[..16],
            Uuid::new_v4().simple(),
            Self::extension_for(format)
        )
    }

    /// Preferred file extension for a format.
    pub fn extension_for(format: ImageFormat) -> &'static str {
        format.extensions_str().first().copied().unwrap_or("bin")
    }

    /// Resolve a stored file name to a path, rejecting anything that is not a bare name.
    fn path_for(&self, file_name: &str) -> AppResult<PathBuf> {
        let is_bare = !file_name.is_empty()
            && Path::new(file_name).file_name().and_then(|n| n.to_str()) == Some(file_name);
        if !is_bare {
            return Err(AppError::Storage(format!(
                "Invalid stored file name: {}",
                file_name
            )));
        }
        Ok(self.root.join(file_name))
    }

    /// Read a stored file. A missing file is reported as `NotFound`.
    pub async fn read(&self, file_name: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(file_name)?;
        debug!("Reading image file {}", path.display());

        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::NotFound(format!("Image file {}", file_name))
            } else {
                AppError::Storage(format!("Failed to read {}: {}", path.display(), e))
            }
        })
    }

    /// Write a file atomically: readers see the old content or the new
    /// content, never a partial write.
    pub async fn write(&self, file_name: &str, data: &[u8]) -> AppResult<()> {
        let path = self.path_for(file_name)?;
        let tmp_path = self.root.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to write {}: {}",
                tmp_path.display(),
                e
            )));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Remove a stored file. Returns `false` when it was already gone.
    pub async fn remove(&self, file_name: &str) -> AppResult<bool> {
        let path = self.path_for(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
