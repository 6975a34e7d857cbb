use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// An image captured from user input. Immutable once built.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Bytes,
    file_name: String,
    media_type: String,
}

impl ImagePayload {
    pub fn new(
        bytes: impl Into<Bytes>,
        file_name: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            media_type: media_type.into(),
        }
    }

    /// Build a payload from raw bytes, detecting the media type from the content.
    pub fn from_bytes(bytes: impl Into<Bytes>, file_name: impl Into<String>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidImage("empty file".to_string()));
        }
        let format =
            image::guess_format(&bytes).map_err(|e| Error::InvalidImage(e.to_string()))?;
        Ok(Self::new(bytes, file_name, format.to_mime_type()))
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::from_bytes(bytes, file_name)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Multipart part carrying the image. The form builder owns the boundary.
    pub fn to_part(&self) -> Result<reqwest::multipart::Part> {
        Ok(reqwest::multipart::Part::bytes(self.bytes.to_vec())
            .file_name(self.file_name.clone())
            .mime_str(&self.media_type)?)
    }
}

/// A publicly fetchable copy of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub thumbnail_url: String,
    pub title: String,
    pub author_name: Option<String>,
    /// Percentage in `0.0..=100.0`.
    pub similarity: f32,
    pub external_links: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    Inline,
    Redirect,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMode::Inline => write!(f, "inline"),
            EngineMode::Redirect => write!(f, "redirect"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEngineDescriptor {
    pub id: String,
    pub display_name: String,
    pub mode: EngineMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
}

impl SearchEngineDescriptor {
    pub fn inline(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            mode: EngineMode::Inline,
            url_template: None,
        }
    }

    pub fn redirect(id: &str, display_name: &str, url_template: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            mode: EngineMode::Redirect,
            url_template: Some(url_template.to_string()),
        }
    }
}
