use crate::error::{Error, Result};
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";
const DEFAULT_USER_AGENT: &str = concat!("reverse-image-search/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct Network {
    client: Client,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network").finish()
    }
}

impl Network {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT, None)
    }

    /// Every request made through this client is bounded by `timeout`.
    pub fn with_options(timeout: Duration, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT);
        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::Configuration(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn post_multipart(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response> {
        self.post_multipart_with_headers(url, form, HeaderMap::new())
            .await
    }

    /// Posts `form` as `multipart/form-data`. `headers` must not carry a
    /// content type; reqwest derives it together with the boundary.
    pub async fn post_multipart_with_headers(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
        mut headers: HeaderMap,
    ) -> Result<Response> {
        if headers.remove(reqwest::header::CONTENT_TYPE).is_some() {
            debug!("Dropping caller-supplied content type for multipart request to {}", url);
        }
        debug!(
            "POST multipart request to: {} with headers: {:?}",
            url, headers
        );
        Ok(self
            .client
            .post(url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?)
    }
}

/// Fails with `UpstreamUnavailable` unless the response has a 2xx status.
/// The response body is logged, not propagated.
pub async fn ensure_success(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("{} returned status {}: {}", service, status, body);
    Err(Error::UpstreamUnavailable(format!(
        "{} returned status code: {}",
        service, status
    )))
}
