// media.rs
//
// Selected media file and the validation gate applied before any upload.

use std::path::Path;

use bytes::Bytes;

use crate::error::TranscribeError;

/// Upload ceiling enforced before contacting the service (100 MiB).
pub const MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// An immutable, pre-validated media selection.
#[derive(Debug, Clone)]
pub struct MediaFile {
    name: String,
    kind: MediaKind,
    payload: Bytes,
}

impl MediaFile {
    /// Build a media file, rejecting payloads over [`MAX_FILE_BYTES`].
    pub fn new(
        name: impl Into<String>,
        kind: MediaKind,
        payload: Bytes,
    ) -> Result<Self, TranscribeError> {
        let size = payload.len() as u64;
        if size > MAX_FILE_BYTES {
            return Err(TranscribeError::FileTooLarge {
                size,
                limit: MAX_FILE_BYTES,
            });
        }
        Ok(Self {
            name: name.into(),
            kind,
            payload,
        })
    }

    /// Read a file from disk, inferring the media kind from its extension.
    pub fn from_path(path: &Path) -> Result<Self, TranscribeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = kind_for_extension(&ext)
            .ok_or_else(|| TranscribeError::UnsupportedMedia(format!(".{ext}")))?;

        // Check the on-disk size before pulling the payload into memory.
        let size = std::fs::metadata(path)
            .map_err(|e| TranscribeError::Upload(format!("cannot read {}: {e}", path.display())))?
            .len();
        if size > MAX_FILE_BYTES {
            return Err(TranscribeError::FileTooLarge {
                size,
                limit: MAX_FILE_BYTES,
            });
        }

        let payload = std::fs::read(path)
            .map_err(|e| TranscribeError::Upload(format!("cannot read {}: {e}", path.display())))?;
        Self::new(name, kind, Bytes::from(payload))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Map a file extension to its media kind, mirroring the `video/*` /
/// `audio/*` MIME gate of the file picker.
pub fn kind_for_extension(ext: &str) -> Option<MediaKind> {
    match ext {
        "mp4" | "m4v" | "mov" | "mkv" | "webm" | "avi" => Some(MediaKind::Video),
        "mp3" | "wav" | "m4a" | "flac" | "ogg" | "aac" | "opus" => Some(MediaKind::Audio),
        _ => None,
    }
}
