//! Image acquisition: turns a camera capture (data URI) or a picked file into a
//! [`ReceiptImage`]. Nothing here touches the network.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::path::Path;

const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidImageInput {
    pub detail: String,
}

impl InvalidImageInput {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Message shown to the user when they are re-prompted.
    pub fn user_message(&self) -> &'static str {
        INVALID_IMAGE_MESSAGE
    }
}

impl fmt::Display for InvalidImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid image input: {}", self.detail)
    }
}

impl std::error::Error for InvalidImageInput {}

impl ReceiptImage {
    /// Camera path: `data:image/jpeg;base64,....`
    pub fn from_data_uri(uri: &str) -> Result<Self, InvalidImageInput> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| InvalidImageInput::new("missing data: prefix"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| InvalidImageInput::new("missing ',' separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| InvalidImageInput::new("data URI is not base64 encoded"))?;

        ensure_image_mime(mime_type)?;
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(InvalidImageInput::new("empty image payload"));
        }

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            data: payload.to_string(),
        })
    }

    /// File picker path. The declared MIME type must start with `image/`.
    pub fn from_file(mime_type: &str, bytes: &[u8]) -> Result<Self, InvalidImageInput> {
        ensure_image_mime(mime_type)?;
        if bytes.is_empty() {
            return Err(InvalidImageInput::new("empty image file"));
        }
        Ok(Self {
            mime_type: mime_type.trim().to_ascii_lowercase(),
            data: STANDARD.encode(bytes),
        })
    }

    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let mime_type = mime_from_extension(path).unwrap_or("application/octet-stream");
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_file(mime_type, &bytes)?)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload with the data URI prefix stripped.
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn ensure_image_mime(mime_type: &str) -> Result<(), InvalidImageInput> {
    if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(InvalidImageInput::new(format!(
            "unsupported MIME type {mime_type:?}"
        )))
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
