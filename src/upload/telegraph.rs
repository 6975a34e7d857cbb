use super::UploadProvider;
use crate::error::{Error, Result};
use crate::network::{ensure_success, Network, BROWSER_USER_AGENT};
use crate::types::{ImagePayload, UploadResult};
use crate::utils::ensure_absolute_url;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart;
use serde::Deserialize;

const BASE_URL: &str = "https://telegra.ph";

pub struct Telegraph {
    network: Network,
    base_url: String,
}

impl Telegraph {
    pub fn new(network: Network) -> Self {
        Self::with_base_url(network, BASE_URL)
    }

    pub fn with_base_url(network: Network, base_url: &str) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        // telegra.ph rejects uploads that look automated
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }
}

// [{ "src": "/file/abc.jpg" }] on success, { "error": "..." } otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TelegraphResponse {
    Files(Vec<TelegraphFile>),
    Failure { error: String },
}

#[derive(Debug, Deserialize)]
struct TelegraphFile {
    src: String,
}

#[async_trait]
impl UploadProvider for Telegraph {
    fn name(&self) -> &'static str {
        "telegraph"
    }

    async fn upload(&self, payload: &ImagePayload) -> Result<UploadResult> {
        let form = multipart::Form::new().part("file", payload.to_part()?);

        let response = self
            .network
            .post_multipart_with_headers(
                &format!("{}/upload", self.base_url),
                form,
                Self::build_headers(),
            )
            .await?;
        let response = ensure_success(self.name(), response).await?;

        let body: TelegraphResponse = serde_json::from_str(&response.text().await?)?;
        let src = match body {
            TelegraphResponse::Files(files) => files
                .into_iter()
                .next()
                .map(|f| f.src)
                .ok_or_else(|| Error::UpstreamSchema("telegraph returned no files".to_string()))?,
            TelegraphResponse::Failure { error } => {
                return Err(Error::UpstreamUnavailable(format!("telegraph: {}", error)))
            }
        };
        if !src.starts_with('/') {
            return Err(Error::UpstreamSchema(format!(
                "telegraph returned a non-path src: {}",
                src
            )));
        }

        let url = ensure_absolute_url(&format!("{}{}", self.base_url, src))?;
        Ok(UploadResult { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jpeg() -> ImagePayload {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.resize(10 * 1024, 0);
        ImagePayload::new(bytes, "photo.jpg", "image/jpeg")
    }

    fn provider(server: &MockServer) -> Telegraph {
        Telegraph::with_base_url(Network::new().unwrap(), &server.uri())
    }

    #[tokio::test]
    async fn test_upload_joins_base_and_src() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_regex("user-agent", r"^Mozilla/5\.0 \(Windows"))
            .and(header_regex("content-type", "^multipart/form-data; boundary=.+"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "src": "/file/abc123.jpg" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server).upload(&jpeg()).await.unwrap();
        assert_eq!(result.url, format!("{}/file/abc123.jpg", server.uri()));
    }

    #[tokio::test]
    async fn test_upload_sends_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "src": "/file/x.jpg" }])))
            .mount(&server)
            .await;

        provider(&server).upload(&jpeg()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\"; filename=\"photo.jpg\""));
        assert!(body.contains("Content-Type: image/jpeg"));
    }

    #[tokio::test]
    async fn test_upload_rejects_unexpected_shapes() {
        for body in [
            serde_json::json!([]),
            serde_json::json!([{ "path": "/file/x.jpg" }]),
            serde_json::json!({ "url": "https://telegra.ph/file/x.jpg" }),
            serde_json::json!([{ "src": "file/x.jpg" }]),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                .mount(&server)
                .await;

            let err = provider(&server).upload(&jpeg()).await.unwrap_err();
            assert!(matches!(err, Error::UpstreamSchema(_)), "{body}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_upload_maps_error_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": "File type invalid" })))
            .mount(&server)
            .await;
        let err = provider(&server).upload(&jpeg()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let err = provider(&server).upload(&jpeg()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }
}
