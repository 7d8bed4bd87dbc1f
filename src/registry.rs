use std::collections::HashMap;
use std::io::Cursor;

use anyhow::Result;
use tracing::{debug, warn};

/// Identity of one live decoded image. Ids are never reused within a
/// session, so two handles are never equal even when derived from
/// identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

/// A decoded, renderable image owned by the registry (RGBA8).
#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Owns every temporary decoded image in the session and guarantees each
/// is released exactly once.
///
/// Slots (a photo's display slot, the controller's preview slot) hold
/// `HandleId`s; pixel data lives only here. A handle installed in a slot
/// must be removed from that slot before it is released.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    live: HashMap<HandleId, DecodedImage>,
    next: u64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes` and registers the result under a fresh handle.
    /// Fails when the bytes are not a decodable image; nothing is
    /// registered in that case.
    pub fn acquire(&mut self, bytes: &[u8]) -> Result<HandleId> {
        let image = decode_rgba8_apply_exif(bytes)?;
        let id = HandleId(self.next);
        self.next += 1;
        let (width, height) = image.dimensions();
        self.live.insert(
            id,
            DecodedImage {
                width,
                height,
                pixels: image.into_raw(),
            },
        );
        debug!(handle = id.0, width, height, "handle acquired");
        Ok(id)
    }

    /// Releases a handle, invalidating any outstanding reference to it.
    ///
    /// Releasing an unknown or already-released handle is a programming
    /// error: it panics in debug builds and is reported and ignored in
    /// release builds (swallowing it silently would hide a leak).
    pub fn release(&mut self, id: HandleId) {
        if self.live.remove(&id).is_none() {
            debug_assert!(false, "release of unknown or already-released handle {id:?}");
            warn!(handle = id.0, "release of unknown or already-released handle");
            return;
        }
        debug!(handle = id.0, "handle released");
    }

    /// Installs `new` into `slot`, releasing whatever occupied it.
    pub fn replace(&mut self, slot: &mut Option<HandleId>, new: HandleId) {
        if let Some(old) = slot.replace(new) {
            self.release(old);
        }
    }

    pub fn get(&self, id: HandleId) -> Option<&DecodedImage> {
        self.live.get(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

// Decodes to RGBA8 and applies EXIF orientation if available. Orientation
// handling is best-effort; without metadata the stored orientation is kept.
fn decode_rgba8_apply_exif(bytes: &[u8]) -> Result<image::RgbaImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let mut img = img.to_rgba8();

    let orientation: u16 = read_orientation(bytes).unwrap_or(1);
    // Map common EXIF orientations. Unsupported cases fall through as-is.
    match orientation {
        1 => {}
        2 => {
            img = image::imageops::flip_horizontal(&img);
        }
        3 => {
            img = image::imageops::rotate180(&img);
        }
        4 => {
            img = image::imageops::flip_vertical(&img);
        }
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => {
            img = image::imageops::rotate90(&img);
        }
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => {
            img = image::imageops::rotate270(&img);
        }
        _ => {}
    }

    Ok(img)
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let mut buf = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    if let Some(field) = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY) {
        if let Some(val) = field.value.get_uint(0) {
            let o = val as u16;
            debug!("exif orientation {o}");
            return Some(o);
        }
    }
    None
}
