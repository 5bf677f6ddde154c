//! User-selected local audio file

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Fallback when neither content nor extension identify the file
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A local file chosen for upload
///
/// Cloning is cheap; the content buffer is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name sent with the upload (no directories)
    pub name: String,
    /// Declared media type, e.g. `audio/mpeg`
    pub media_type: String,
    pub content: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: Arc::new(content),
        }
    }

    /// Read a file from disk and declare its media type
    ///
    /// Magic bytes take precedence; the extension is consulted only when the
    /// content is not recognised.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let media_type = detect_media_type(path, &content);

        tracing::debug!(
            file = %path.display(),
            media_type = %media_type,
            bytes = content.len(),
            "Loaded selected file"
        );

        Ok(Self::new(name, media_type, content))
    }

    pub fn is_audio(&self) -> bool {
        is_audio_media_type(&self.media_type)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// True for `audio/*` media types (case-insensitive)
pub fn is_audio_media_type(media_type: &str) -> bool {
    media_type
        .trim()
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("audio/"))
        .unwrap_or(false)
}

fn detect_media_type(path: &Path, content: &[u8]) -> String {
    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }

    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .and_then(|ext| media_type_for_extension(&ext))
        .unwrap_or(UNKNOWN_MEDIA_TYPE)
        .to_string()
}

fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    let media_type = match ext {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "wma" => "audio/x-ms-wma",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(media_type)
}
