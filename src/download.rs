use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

/// Host-environment save mechanism: hands a finished artifact to the user
/// by writing it into the download directory. Fire-and-forget from the
/// controller's point of view; the returned path is only used for
/// reporting.
#[derive(Debug, Clone)]
pub struct DownloadSink {
    directory: PathBuf,
}

impl DownloadSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "failed to create download directory {}",
                self.directory.display()
            )
        })?;
        let path = self.directory.join(filename);
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "artifact saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_bytes_under_the_download_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DownloadSink::new(dir.path().join("downloads"));

        let path = sink.save("processed_cat.jpg", b"artifact").unwrap();
        assert_eq!(path.file_name().unwrap(), "processed_cat.jpg");
        assert_eq!(fs::read(&path).unwrap(), b"artifact");
    }
}
