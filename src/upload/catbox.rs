use super::UploadProvider;
use crate::error::Result;
use crate::network::{ensure_success, Network, BROWSER_USER_AGENT};
use crate::types::{ImagePayload, UploadResult};
use crate::utils::ensure_absolute_url;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart;

const BASE_URL: &str = "https://catbox.moe";

/// catbox.moe anonymous uploads. The response body is the bare file URL.
pub struct Catbox {
    network: Network,
    base_url: String,
}

impl Catbox {
    pub fn new(network: Network) -> Self {
        Self::with_base_url(network, BASE_URL)
    }

    pub fn with_base_url(network: Network, base_url: &str) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UploadProvider for Catbox {
    fn name(&self) -> &'static str {
        "catbox"
    }

    async fn upload(&self, payload: &ImagePayload) -> Result<UploadResult> {
        let form = multipart::Form::new()
            .text("reqtype", "fileupload")
            .part("fileToUpload", payload.to_part()?);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let response = self
            .network
            .post_multipart_with_headers(&format!("{}/user/api.php", self.base_url), form, headers)
            .await?;
        let response = ensure_success(self.name(), response).await?;

        let body = response.text().await?;
        Ok(UploadResult {
            url: ensure_absolute_url(body.trim())?,
        })
    }
}
