use crate::error::Result;
use crate::types::{ImagePayload, SearchMatch};
use async_trait::async_trait;

pub mod saucenao;

pub use saucenao::SauceNao;

/// A reverse image search API that accepts the image itself and returns
/// matches without leaving the application.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Get the name of the search engine
    fn name(&self) -> &'static str;

    /// Search for an image using its raw bytes.
    ///
    /// Matches keep the upstream order (highest similarity first). An empty
    /// list means "no match found" and is not an error.
    async fn search(&self, payload: &ImagePayload) -> Result<Vec<SearchMatch>>;
}
