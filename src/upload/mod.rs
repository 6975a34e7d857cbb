use crate::error::Result;
use crate::types::{ImagePayload, UploadResult};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub mod catbox;
pub mod chain;
pub mod imgbb;
pub mod telegraph;

pub use catbox::Catbox;
pub use chain::{FallbackPolicy, UploadChain};
pub use imgbb::ImgBb;
pub use telegraph::Telegraph;

/// Adapter to one external image host.
#[async_trait]
pub trait UploadProvider: Send + Sync {
    /// Get the name of the image host
    fn name(&self) -> &'static str;

    /// Upload `payload` and return its public URL.
    ///
    /// Not idempotent: every call creates a new hosted copy.
    async fn upload(&self, payload: &ImagePayload) -> Result<UploadResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Telegraph,
    ImgBb,
    Catbox,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Telegraph => write!(f, "telegraph"),
            ProviderKind::ImgBb => write!(f, "imgbb"),
            ProviderKind::Catbox => write!(f, "catbox"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegraph" => Ok(ProviderKind::Telegraph),
            "imgbb" => Ok(ProviderKind::ImgBb),
            "catbox" => Ok(ProviderKind::Catbox),
            other => Err(format!("unknown upload provider: {}", other)),
        }
    }
}
