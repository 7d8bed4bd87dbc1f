use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::download::DownloadSink;
use crate::effects::EffectId;
use crate::error::SessionError;
use crate::events::{Intent, Notice, PhotoSummary, PreviewSummary, Snapshot, UploadFile};
use crate::registry::{HandleId, HandleRegistry};
use crate::service::{EffectService, FilePayload};
use crate::tasks::commit::{self, SettledCommit};
use crate::tasks::preview::{self, PreviewTag, SettledPreview};

/// Drives the photo session: the sole writer of session state and handle
/// ownership.
///
/// Rules:
/// - Intents are validated here; pipelines only return results for this
///   loop to apply.
/// - At most one preview flight may update state: the most recently
///   issued one, and only while its target photo is still active. Stale
///   results are discarded silently, their bytes acquired and released so
///   no handle floats unowned.
/// - At most one commit is pending per session; a result stamped with an
///   epoch that ended (session cleared) is discarded without a download.
/// - Every applied, rejected, or settled operation emits a snapshot.
pub async fn run<S: EffectService>(
    mut intent_rx: Receiver<Intent>,
    snapshot_tx: Sender<Snapshot>,
    cancel: CancellationToken,
    service: Arc<S>,
    downloads: DownloadSink,
) -> Result<()> {
    let mut session = Session::new();
    let mut previews: JoinSet<SettledPreview> = JoinSet::new();
    let mut commits: JoinSet<SettledCommit> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_intent = intent_rx.recv() => {
                let Some(intent) = maybe_intent else { break };
                let notice = match intent {
                    Intent::Upload(files) => session.upload(files),
                    Intent::SelectPhoto(index) => session.select_photo(index),
                    Intent::SelectEffect(effect) => match session.begin_preview(effect) {
                        Ok((tag, payload)) => {
                            let service = Arc::clone(&service);
                            previews.spawn(async move {
                                let result = preview::render(service, payload, tag.effect).await;
                                SettledPreview { tag, result }
                            });
                            None
                        }
                        Err(err) => Some(Notice::Rejected(err.to_string())),
                    },
                    Intent::ClearEffect => session.clear_effect(),
                    Intent::Commit => match session.begin_commit() {
                        Ok((epoch, files, effect)) => {
                            let service = Arc::clone(&service);
                            commits.spawn(async move {
                                let result = commit::produce(service, files, effect).await;
                                SettledCommit { epoch, result }
                            });
                            None
                        }
                        Err(err) => Some(Notice::Rejected(err.to_string())),
                    },
                    Intent::ClearSession => {
                        session.clear();
                        None
                    }
                };
                if snapshot_tx.send(session.snapshot(notice)).await.is_err() {
                    break;
                }
            }

            Some(joined) = previews.join_next() => {
                match joined {
                    Ok(settled) => {
                        if let Some(notice) = session.settle_preview(settled) {
                            if snapshot_tx.send(session.snapshot(Some(notice))).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => warn!("preview flight aborted: {err}"),
                }
            }

            Some(joined) = commits.join_next() => {
                match joined {
                    Ok(settled) => {
                        if let Some(notice) = session.settle_commit(settled, &downloads) {
                            if snapshot_tx.send(session.snapshot(Some(notice))).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!("commit flight aborted: {err}");
                        session.abort_commit();
                    }
                }
            }
        }
    }

    // Drop every remaining handle deterministically on the way out.
    session.clear();
    Ok(())
}

struct Photo {
    name: String,
    size_bytes: u64,
    source: Arc<Vec<u8>>,
    display: HandleId,
}

/// Full mutable session state. Owned exclusively by `run`; pipelines see
/// only cloned payloads and settle back through `run`.
struct Session {
    registry: HandleRegistry,
    photos: Vec<Photo>,
    active_index: Option<usize>,
    selected_effect: Option<EffectId>,
    /// Effect-derived preview handle. `None` means the preview is the
    /// active photo's own display handle, which this slot never owns.
    effect_preview: Option<HandleId>,
    pending_preview: Option<PreviewTag>,
    preview_seq: u64,
    commit_pending: bool,
    /// Bumped by `clear`; commit results from an older epoch are stale.
    epoch: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
            photos: Vec::new(),
            active_index: None,
            selected_effect: None,
            effect_preview: None,
            pending_preview: None,
            preview_seq: 0,
            commit_pending: false,
            epoch: 0,
        }
    }

    /// Appends every decodable file to the collection and reports the rest
    /// as rejected. A batch with zero accepted files is a no-op.
    fn upload(&mut self, files: Vec<UploadFile>) -> Option<Notice> {
        let mut rejected = Vec::new();
        let mut accepted = 0usize;
        for file in files {
            match self.registry.acquire(&file.bytes) {
                Ok(display) => {
                    self.photos.push(Photo {
                        size_bytes: file.bytes.len() as u64,
                        name: file.name,
                        source: file.bytes,
                        display,
                    });
                    accepted += 1;
                }
                Err(err) => {
                    debug!(file = %file.name, "rejected non-image upload: {err:#}");
                    rejected.push(file.name);
                }
            }
        }

        if accepted == 0 {
            return Some(Notice::Rejected(SessionError::EmptyUpload.to_string()));
        }

        self.active_index = Some(0);
        self.reset_preview();
        info!(accepted, rejected = rejected.len(), "upload applied");
        Some(Notice::UploadAccepted { accepted, rejected })
    }

    fn select_photo(&mut self, index: usize) -> Option<Notice> {
        if index >= self.photos.len() {
            return Some(Notice::Rejected(
                SessionError::PhotoIndexOutOfRange {
                    index,
                    len: self.photos.len(),
                }
                .to_string(),
            ));
        }
        self.active_index = Some(index);
        self.reset_preview();
        None
    }

    /// Drops any effect-derived preview handle and returns the effect and
    /// preview scalars to their initial values, leaving the photo
    /// collection and active selection untouched.
    fn reset_preview(&mut self) {
        if let Some(old) = self.effect_preview.take() {
            self.registry.release(old);
        }
        self.selected_effect = None;
        self.pending_preview = None;
    }

    /// Issues a new preview flight for the active photo. The returned tag
    /// supersedes any earlier in-flight request by issue order.
    fn begin_preview(
        &mut self,
        effect: EffectId,
    ) -> Result<(PreviewTag, FilePayload), SessionError> {
        let photo_index = self.active_index.ok_or(SessionError::NoPhotos)?;
        let photo = &self.photos[photo_index];
        self.preview_seq += 1;
        let tag = PreviewTag {
            seq: self.preview_seq,
            photo_index,
            effect,
        };
        self.pending_preview = Some(tag);
        Ok((
            tag,
            FilePayload {
                name: photo.name.clone(),
                bytes: Arc::clone(&photo.source),
            },
        ))
    }

    fn clear_effect(&mut self) -> Option<Notice> {
        if self.photos.is_empty() {
            return Some(Notice::Rejected(SessionError::NoPhotos.to_string()));
        }
        self.reset_preview();
        None
    }

    fn begin_commit(&mut self) -> Result<(u64, Vec<FilePayload>, EffectId), SessionError> {
        if self.photos.is_empty() {
            return Err(SessionError::NoPhotos);
        }
        let effect = self.selected_effect.ok_or(SessionError::NoEffectSelected)?;
        if self.commit_pending {
            return Err(SessionError::CommitInFlight);
        }
        self.commit_pending = true;
        let files = self
            .photos
            .iter()
            .map(|photo| FilePayload {
                name: photo.name.clone(),
                bytes: Arc::clone(&photo.source),
            })
            .collect();
        Ok((self.epoch, files, effect))
    }

    /// Releases every handle and returns every scalar to its initial
    /// value. Valid from any state.
    fn clear(&mut self) {
        if let Some(old) = self.effect_preview.take() {
            self.registry.release(old);
        }
        for photo in self.photos.drain(..) {
            self.registry.release(photo.display);
        }
        self.active_index = None;
        self.selected_effect = None;
        self.pending_preview = None;
        self.commit_pending = false;
        self.epoch += 1;
    }

    fn abort_commit(&mut self) {
        self.commit_pending = false;
    }

    /// Applies a settled preview flight, or discards it when stale. A
    /// stale success is acquired and immediately released so its handle is
    /// never left unowned; stale results produce no notice and no
    /// snapshot.
    fn settle_preview(&mut self, settled: SettledPreview) -> Option<Notice> {
        if !settled.is_current(self.pending_preview.as_ref(), self.active_index) {
            if let Ok(bytes) = &settled.result {
                if let Ok(handle) = self.registry.acquire(bytes) {
                    self.registry.release(handle);
                }
            }
            debug!(seq = settled.tag.seq, "discarded stale preview result");
            return None;
        }

        self.pending_preview = None;
        match settled.result {
            Ok(bytes) => match self.registry.acquire(&bytes) {
                Ok(handle) => {
                    self.registry.replace(&mut self.effect_preview, handle);
                    self.selected_effect = Some(settled.tag.effect);
                    Some(Notice::PreviewApplied(settled.tag.effect))
                }
                Err(err) => Some(Notice::PreviewFailed(format!(
                    "preview response could not be decoded: {err:#}"
                ))),
            },
            Err(err) => Some(Notice::PreviewFailed(err.to_string())),
        }
    }

    /// Applies a settled commit flight, or discards it when its session
    /// epoch has ended. Success hands the artifact to the download sink;
    /// failure surfaces the error and leaves effect/preview state alone.
    fn settle_commit(&mut self, settled: SettledCommit, downloads: &DownloadSink) -> Option<Notice> {
        if settled.epoch != self.epoch {
            debug!("discarded stale commit result");
            return None;
        }

        self.commit_pending = false;
        match settled.result {
            Ok(artifact) => match downloads.save(&artifact.filename, &artifact.bytes) {
                Ok(path) => {
                    info!(photos = artifact.photos, path = %path.display(), "commit complete");
                    Some(Notice::CommitSaved {
                        photos: artifact.photos,
                        path,
                    })
                }
                Err(err) => Some(Notice::CommitFailed(format!(
                    "artifact could not be saved: {err:#}"
                ))),
            },
            Err(err) => Some(Notice::CommitFailed(err.to_string())),
        }
    }

    fn current_preview_handle(&self) -> Option<HandleId> {
        self.effect_preview
            .or_else(|| self.active_index.map(|index| self.photos[index].display))
    }

    fn snapshot(&self, notice: Option<Notice>) -> Snapshot {
        let photos = self
            .photos
            .iter()
            .map(|photo| {
                let (width, height) = self
                    .registry
                    .get(photo.display)
                    .map_or((0, 0), |img| (img.width, img.height));
                PhotoSummary {
                    name: photo.name.clone(),
                    size_bytes: photo.size_bytes,
                    width,
                    height,
                }
            })
            .collect();
        let preview = self.current_preview_handle().and_then(|handle| {
            self.registry.get(handle).map(|img| PreviewSummary {
                handle,
                width: img.width,
                height: img.height,
            })
        });
        Snapshot {
            photos,
            active_index: self.active_index,
            selected_effect: self.selected_effect,
            preview,
            preview_pending: self.pending_preview.is_some(),
            commit_pending: self.commit_pending,
            live_handles: self.registry.len(),
            notice,
        }
    }
}
