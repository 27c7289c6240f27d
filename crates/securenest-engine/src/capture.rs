//! Image capture: user-selected files become immutable in-memory records.
//!
//! Each record owns an optional [`PreviewHandle`], a thumbnail written to a
//! temporary file. The file lives exactly as long as the record, so removing
//! an image or clearing the tray releases its preview without bookkeeping.
//! Payloads are not validated; anything the user selects is forwarded.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";
const PREVIEW_MAX_EDGE: u32 = 256;
const IMAGE_ID_LEN: usize = 9;

/// Raw bytes of one selected file.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub label: String,
    pub bytes: Vec<u8>,
    pub mime_hint: Option<&'static str>,
}

impl ImageSource {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
            mime_hint: None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let label = path
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| !value.is_empty())
            .unwrap_or("image")
            .to_string();
        Ok(Self {
            label,
            bytes,
            mime_hint: mime_for_path(path),
        })
    }
}

/// Image payload tagged with its encoding, as sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
    width: u32,
    height: u32,
}

impl PreviewHandle {
    fn create(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).context("preview decode failed")?;
        let thumb = decoded.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE);
        let mut file = tempfile::Builder::new()
            .prefix("securenest-preview-")
            .suffix(".png")
            .tempfile()
            .context("preview file create failed")?;
        thumb
            .write_to(&mut file, ImageFormat::Png)
            .context("preview encode failed")?;
        file.flush()?;
        Ok(Self {
            width: thumb.width(),
            height: thumb.height(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug)]
pub struct UploadedImage {
    id: String,
    label: String,
    bytes: Vec<u8>,
    mime_type: String,
    base64: String,
    preview: Option<PreviewHandle>,
}

impl UploadedImage {
    fn from_source(id: String, source: ImageSource, with_preview: bool) -> Self {
        let preview = if with_preview {
            match PreviewHandle::create(&source.bytes) {
                Ok(preview) => Some(preview),
                Err(err) => {
                    tracing::warn!(image = %source.label, error = %err, "preview unavailable");
                    None
                }
            }
        } else {
            None
        };
        let mime_type = detect_mime_type(&source.bytes, source.mime_hint).to_string();
        let base64 = BASE64.encode(&source.bytes);
        Self {
            id,
            label: source.label,
            bytes: source.bytes,
            mime_type,
            base64,
            preview,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn encoded(&self) -> EncodedImage {
        EncodedImage {
            mime_type: self.mime_type.clone(),
            data: self.base64.clone(),
        }
    }
}

/// Ordered collection of pending images.
#[derive(Debug)]
pub struct ImageTray {
    images: Vec<UploadedImage>,
    previews: bool,
}

impl Default for ImageTray {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTray {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            previews: true,
        }
    }

    pub fn without_previews() -> Self {
        Self {
            images: Vec::new(),
            previews: false,
        }
    }

    /// Appends one record per source and returns the assigned ids in order.
    pub fn add(&mut self, sources: impl IntoIterator<Item = ImageSource>) -> Vec<String> {
        let mut ids = Vec::new();
        for source in sources {
            let id = self.fresh_id();
            tracing::debug!(
                id = %id,
                image = %source.label,
                bytes = source.bytes.len(),
                "image added"
            );
            self.images
                .push(UploadedImage::from_source(id.clone(), source, self.previews));
            ids.push(id);
        }
        ids
    }

    /// Removes the record with `id`. Returns false when no record matches.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(idx) = self.images.iter().position(|image| image.id == id) else {
            return false;
        };
        self.images.remove(idx);
        true
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedImage> {
        self.images.iter()
    }

    pub fn get(&self, id: &str) -> Option<&UploadedImage> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.images.iter().map(|image| image.id.clone()).collect()
    }

    pub fn encoded_payloads(&self) -> Vec<EncodedImage> {
        self.images.iter().map(UploadedImage::encoded).collect()
    }

    fn fresh_id(&self) -> String {
        loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(IMAGE_ID_LEN)
                .collect();
            if !self.images.iter().any(|image| image.id == candidate) {
                return candidate;
            }
        }
    }
}

fn detect_mime_type(bytes: &[u8], hint: Option<&'static str>) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .or(hint)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
