use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::UploadSettings;
use crate::utils::error::{RelayError, Result};

/// A file written into the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub filename: String,
    pub path: PathBuf,
    /// Relative download path announced to clients, e.g. `/files/a.pdf`.
    pub public_path: String,
}

/// Shared temp directory for uploaded files.
///
/// Each upload keeps its original file name, so two uploads with the same
/// name overwrite each other.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_prefix: String,
}

impl UploadStore {
    /// Opens the store, creating the directory if it does not exist yet.
    pub async fn open(settings: &UploadSettings) -> Result<Self> {
        tokio::fs::create_dir_all(&settings.dir).await?;
        info!("Upload directory ready at {}", settings.dir.display());
        Ok(Self {
            dir: settings.dir.clone(),
            public_prefix: settings.public_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_path(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    /// Writes `bytes` under the final component of `filename`. Directory
    /// parts supplied by the client are dropped.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<StoredUpload> {
        let filename = sanitize_filename(filename)?;
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredUpload {
            public_path: self.public_path(&filename),
            filename,
            path,
        })
    }

    /// Deletes the directory and everything in it. A directory that is
    /// already gone is not an error.
    pub async fn remove_all(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!("Removed upload directory {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize_filename(filename: &str) -> Result<String> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(RelayError::InvalidFilename(filename.to_string()));
    }
    Ok(name.to_string())
}
