use std::path::PathBuf;
use std::sync::Arc;

use crate::effects::EffectId;
use crate::registry::HandleId;

/// One file offered to the upload intent.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
}

/// User intents accepted by the session controller.
#[derive(Debug, Clone)]
pub enum Intent {
    Upload(Vec<UploadFile>),
    SelectPhoto(usize),
    SelectEffect(EffectId),
    ClearEffect,
    Commit,
    ClearSession,
}

/// Consistent state snapshot emitted after every controller step. The
/// renderer consumes these; the controller never exposes its mutable
/// state directly.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub photos: Vec<PhotoSummary>,
    pub active_index: Option<usize>,
    pub selected_effect: Option<EffectId>,
    pub preview: Option<PreviewSummary>,
    pub preview_pending: bool,
    pub commit_pending: bool,
    /// Number of decoded images currently held by the handle registry.
    pub live_handles: usize,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone)]
pub struct PhotoSummary {
    pub name: String,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
}

impl PhotoSummary {
    /// Human-readable size, e.g. `1.18 MB`.
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
        if self.size_bytes == 0 {
            return "0 Bytes".to_string();
        }
        let exp = ((self.size_bytes as f64).log2() / 10.0).floor() as usize;
        let exp = exp.min(UNITS.len() - 1);
        let value = self.size_bytes as f64 / 1024f64.powi(exp as i32);
        let formatted = format!("{value:.2}");
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        format!("{trimmed} {}", UNITS[exp])
    }
}

/// The image currently shown for the active photo: either the photo's own
/// display handle or an effect-processed substitute.
#[derive(Debug, Clone)]
pub struct PreviewSummary {
    pub handle: HandleId,
    pub width: u32,
    pub height: u32,
}

/// What just happened, attached to the snapshot for rendering.
#[derive(Debug, Clone)]
pub enum Notice {
    /// Upload outcome: how many files entered the collection and which
    /// were dropped as non-images.
    UploadAccepted { accepted: usize, rejected: Vec<String> },
    /// An intent was refused; no state changed.
    Rejected(String),
    PreviewApplied(EffectId),
    PreviewFailed(String),
    /// A commit artifact was handed to the download mechanism.
    CommitSaved { photos: usize, path: PathBuf },
    CommitFailed(String),
}
