use super::UploadProvider;
use crate::error::{Error, Result};
use crate::network::{ensure_success, Network};
use crate::types::{ImagePayload, UploadResult};
use crate::utils::ensure_absolute_url;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

const BASE_URL: &str = "https://api.imgbb.com";

pub struct ImgBb {
    network: Network,
    base_url: String,
    api_key: Option<String>,
    expiration: Option<u64>,
}

impl ImgBb {
    pub fn new(network: Network, api_key: Option<String>) -> Self {
        Self::with_base_url(network, BASE_URL, api_key)
    }

    pub fn with_base_url(network: Network, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            expiration: None,
        }
    }

    /// Ask the host to delete the image after `seconds`.
    pub fn with_expiration(mut self, seconds: Option<u64>) -> Self {
        self.expiration = seconds;
        self
    }

    fn endpoint(&self, api_key: &str) -> Result<String> {
        let mut params = vec![("key", api_key.to_string())];
        if let Some(expiration) = self.expiration {
            params.push(("expiration", expiration.to_string()));
        }
        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| Error::Configuration(format!("imgbb query: {}", e)))?;
        Ok(format!("{}/1/upload?{}", self.base_url, query))
    }
}

#[derive(Debug, Deserialize)]
struct ImgBbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgBbData>,
    error: Option<ImgBbError>,
}

#[derive(Debug, Deserialize)]
struct ImgBbData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImgBbError {
    message: Option<String>,
}

#[async_trait]
impl UploadProvider for ImgBb {
    fn name(&self) -> &'static str {
        "imgbb"
    }

    async fn upload(&self, payload: &ImagePayload) -> Result<UploadResult> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("IMGBB_API_KEY is not set".to_string()))?;

        let form = multipart::Form::new().part("image", payload.to_part()?);
        let response = self
            .network
            .post_multipart(&self.endpoint(api_key)?, form)
            .await?;
        let response = ensure_success(self.name(), response).await?;

        let body: ImgBbResponse = serde_json::from_str(&response.text().await?)?;
        if !body.success {
            let message = body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "upload not successful".to_string());
            return Err(Error::UpstreamUnavailable(format!("imgbb: {}", message)));
        }
        let data = body
            .data
            .ok_or_else(|| Error::UpstreamSchema("imgbb response has no data".to_string()))?;

        Ok(UploadResult {
            url: ensure_absolute_url(&data.url)?,
        })
    }
}
