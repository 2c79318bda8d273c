use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// On-disk storage for uploaded images. Each upload is a single flat file
/// at `{dir}/{generated filename}`; the generated name is the only key
/// shared with the metadata table.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the full file contents, creating the directory if it was
    /// removed after startup.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.file_path(filename);
        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Delete a stored file. An already-absent file is not an error so that
    /// metadata cleanup can proceed regardless.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, filename: &str) -> bool {
        fs::try_exists(self.file_path(filename)).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("images")).await.unwrap();

        storage.save("a.png", b"png-bytes").await.unwrap();
        assert!(storage.exists("a.png").await);
        assert_eq!(fs::read(storage.file_path("a.png")).await.unwrap(), b"png-bytes");

        storage.delete("a.png").await.unwrap();
        assert!(!storage.exists("a.png").await);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("images")).await.unwrap();

        // Never written; delete must still succeed
        storage.delete("missing.png").await.unwrap();
    }

    #[tokio::test]
    async fn save_recreates_removed_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("images")).await.unwrap();

        fs::remove_dir_all(storage.dir()).await.unwrap();
        storage.save("b.png", b"bytes").await.unwrap();
        assert!(storage.exists("b.png").await);
    }
}
