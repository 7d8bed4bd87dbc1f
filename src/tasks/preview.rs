use std::sync::Arc;

use tracing::debug;

use crate::effects::EffectId;
use crate::error::ServiceError;
use crate::service::{EffectService, FilePayload};

/// Tag for the single permitted outstanding preview request: which photo
/// and effect it targets, and its position in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTag {
    pub seq: u64,
    pub photo_index: usize,
    pub effect: EffectId,
}

/// Outcome of one settled preview flight, paired with the tag it was
/// issued under so the controller can recognize stale results.
#[derive(Debug)]
pub struct SettledPreview {
    pub tag: PreviewTag,
    pub result: Result<Vec<u8>, ServiceError>,
}

impl SettledPreview {
    /// A settled flight may only touch state while it is still the most
    /// recently issued request and still targets the active photo.
    /// Requests are ordered by issue time, not completion time.
    pub fn is_current(&self, pending: Option<&PreviewTag>, active_index: Option<usize>) -> bool {
        pending == Some(&self.tag) && active_index == Some(self.tag.photo_index)
    }
}

/// One preview flight: the active photo's original bytes plus the chosen
/// effect, exchanged for processed image bytes.
///
/// This performs no state mutation of its own; the controller decides
/// whether the settled result is still current before installing it.
pub async fn render<S: EffectService>(
    service: Arc<S>,
    photo: FilePayload,
    effect: EffectId,
) -> Result<Vec<u8>, ServiceError> {
    debug!(photo = %photo.name, effect = %effect, "requesting preview");
    service.apply(effect, vec![photo]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(seq: u64, photo_index: usize) -> PreviewTag {
        PreviewTag {
            seq,
            photo_index,
            effect: EffectId::Vintage,
        }
    }

    fn settled(tag: PreviewTag) -> SettledPreview {
        SettledPreview {
            tag,
            result: Ok(Vec::new()),
        }
    }

    #[test]
    fn current_when_tag_matches_pending_and_photo_is_active() {
        let flight = settled(tag(3, 0));
        assert!(flight.is_current(Some(&tag(3, 0)), Some(0)));
    }

    #[test]
    fn stale_when_a_newer_request_was_issued() {
        let flight = settled(tag(3, 0));
        assert!(!flight.is_current(Some(&tag(4, 0)), Some(0)));
    }

    #[test]
    fn stale_when_the_user_moved_to_another_photo() {
        let flight = settled(tag(3, 0));
        assert!(!flight.is_current(Some(&tag(3, 0)), Some(1)));
        assert!(!flight.is_current(None, Some(0)));
    }
}
