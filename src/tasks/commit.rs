use std::sync::Arc;

use tracing::debug;

use crate::effects::EffectId;
use crate::error::ServiceError;
use crate::service::{EffectService, FilePayload};

/// Fixed name for the multi-photo archive artifact.
pub const ARCHIVE_FILENAME: &str = "lensify_processed_images.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    SingleImage,
    Archive,
}

/// A finished batch artifact, ready for the download sink.
#[derive(Debug)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub kind: ArtifactKind,
    pub filename: String,
    /// How many photos the artifact covers, for reporting.
    pub photos: usize,
}

/// Outcome of one settled commit flight, stamped with the session epoch it
/// was issued in so results that outlive their session are discarded.
#[derive(Debug)]
pub struct SettledCommit {
    pub epoch: u64,
    pub result: Result<Artifact, ServiceError>,
}

/// Deterministic artifact naming: a lone photo keeps its own name behind a
/// `processed_` prefix, a batch gets the fixed archive name.
pub fn artifact_name(files: &[FilePayload]) -> (ArtifactKind, String) {
    if files.len() == 1 {
        (
            ArtifactKind::SingleImage,
            format!("processed_{}", files[0].name),
        )
    } else {
        (ArtifactKind::Archive, ARCHIVE_FILENAME.to_string())
    }
}

/// One commit flight: every photo's original bytes plus the shared effect,
/// exchanged for a single downloadable artifact. Archive construction for
/// the multi-photo case happens service-side; the bytes come back ready to
/// save.
pub async fn produce<S: EffectService>(
    service: Arc<S>,
    files: Vec<FilePayload>,
    effect: EffectId,
) -> Result<Artifact, ServiceError> {
    debug!(photos = files.len(), effect = %effect, "requesting batch commit");
    let (kind, filename) = artifact_name(&files);
    let photos = files.len();
    let bytes = service.apply(effect, files).await?;
    Ok(Artifact {
        bytes,
        kind,
        filename,
        photos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str) -> FilePayload {
        FilePayload {
            name: name.to_string(),
            bytes: Arc::new(vec![0u8; 4]),
        }
    }

    #[test]
    fn single_photo_keeps_its_name_behind_a_prefix() {
        let (kind, name) = artifact_name(&[payload("cat.jpg")]);
        assert_eq!(kind, ArtifactKind::SingleImage);
        assert_eq!(name, "processed_cat.jpg");
    }

    #[test]
    fn batches_use_the_fixed_archive_name() {
        let (kind, name) = artifact_name(&[payload("a.jpg"), payload("b.jpg")]);
        assert_eq!(kind, ArtifactKind::Archive);
        assert_eq!(name, ARCHIVE_FILENAME);
    }
}
