use std::collections::HashMap;
use std::path::Path;

use crate::config::MediaTypeEntry;
use crate::metadata_db::ItemKind;

pub const DIRECTORY_MIME: &str = "inode/directory";
pub const FALLBACK_MIME: &str = "application/octet-stream";

const BUILTIN_MEDIA_TYPES: &[(&str, ItemKind, &str)] = &[
    ("mp4", ItemKind::Video, "video/mp4"),
    ("mkv", ItemKind::Video, "video/x-matroska"),
    ("avi", ItemKind::Video, "video/x-msvideo"),
    ("webm", ItemKind::Video, "video/webm"),
    ("mov", ItemKind::Video, "video/quicktime"),
    ("mp3", ItemKind::Audio, "audio/mpeg"),
    ("flac", ItemKind::Audio, "audio/flac"),
    ("ogg", ItemKind::Audio, "audio/ogg"),
    ("wav", ItemKind::Audio, "audio/wav"),
    ("m4a", ItemKind::Audio, "audio/mp4"),
    ("jpg", ItemKind::Image, "image/jpeg"),
    ("jpeg", ItemKind::Image, "image/jpeg"),
    ("png", ItemKind::Image, "image/png"),
    ("gif", ItemKind::Image, "image/gif"),
    ("webp", ItemKind::Image, "image/webp"),
    ("txt", ItemKind::Text, "text/plain"),
    ("md", ItemKind::Text, "text/markdown"),
    ("srt", ItemKind::Text, "application/x-subrip"),
    ("pdf", ItemKind::File, "application/pdf"),
];

/// Classification of a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub kind: ItemKind,
    pub mime: String,
}

/// Maps (lower case) file extensions to media classifications.
/// Starts out with a built-in table that configured entries extend or override.
#[derive(Debug, Clone)]
pub struct MediaTypes {
    by_extension: HashMap<String, MediaType>,
}

impl MediaTypes {
    pub fn builtin() -> Self {
        let by_extension = BUILTIN_MEDIA_TYPES
            .iter()
            .map(|(extension, kind, mime)| {
                (
                    extension.to_string(),
                    MediaType {
                        kind: *kind,
                        mime: mime.to_string(),
                    },
                )
            })
            .collect();

        Self { by_extension }
    }

    pub fn with_entries(entries: &[MediaTypeEntry]) -> Self {
        let mut result = Self::builtin();
        for entry in entries {
            result.by_extension.insert(
                entry.extension.trim_start_matches('.').to_lowercase(),
                MediaType {
                    kind: entry.kind,
                    mime: entry.mime.clone(),
                },
            );
        }

        result
    }

    /// Classifies a file by its extension, unknown extensions are generic files.
    pub fn classify<P: AsRef<Path>>(&self, path: P) -> MediaType {
        path.as_ref()
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.by_extension.get(&extension.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| MediaType {
                kind: ItemKind::File,
                mime: FALLBACK_MIME.to_string(),
            })
    }

    pub fn directory() -> MediaType {
        MediaType {
            kind: ItemKind::Directory,
            mime: DIRECTORY_MIME.to_string(),
        }
    }
}
