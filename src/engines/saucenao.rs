use super::ImageSearch;
use crate::error::{Error, Result};
use crate::network::{ensure_success, Network};
use crate::types::{ImagePayload, SearchMatch};
use crate::utils::normalize_url;
use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;

const BASE_URL: &str = "https://saucenao.com";
pub const DEFAULT_RESULT_COUNT: u32 = 3;

pub struct SauceNao {
    network: Network,
    base_url: String,
    api_key: Option<String>,
    result_count: u32,
}

impl SauceNao {
    pub fn new(network: Network, api_key: Option<String>) -> Self {
        Self::with_base_url(network, BASE_URL, api_key)
    }

    pub fn with_base_url(network: Network, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            result_count: DEFAULT_RESULT_COUNT,
        }
    }

    pub fn with_result_count(mut self, result_count: u32) -> Self {
        self.result_count = result_count.max(1);
        self
    }
}

#[derive(Debug, Deserialize)]
struct SauceNaoResponse {
    header: Header,
    results: Option<Vec<ResultItem>>,
}

#[derive(Debug, Deserialize)]
struct Header {
    status: i32,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    header: ResultHeader,
    data: ResultData,
}

#[derive(Debug, Deserialize)]
struct ResultHeader {
    similarity: String,
    thumbnail: String,
    #[serde(default)]
    index_name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    ext_urls: Option<Vec<String>>,
    title: Option<String>,
    member_name: Option<String>,
    author_name: Option<String>,
    source: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ResultItem {
    fn into_match(self) -> Result<SearchMatch> {
        let similarity = self
            .header
            .similarity
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|s| (0.0..=100.0).contains(s))
            .ok_or_else(|| {
                Error::UpstreamSchema(format!(
                    "invalid similarity: {:?}",
                    self.header.similarity
                ))
            })?;

        let data = self.data;
        let title = non_empty(data.title)
            .or_else(|| non_empty(data.source))
            .unwrap_or(self.header.index_name);

        Ok(SearchMatch {
            thumbnail_url: normalize_url(&self.header.thumbnail),
            title,
            author_name: non_empty(data.member_name).or_else(|| non_empty(data.author_name)),
            similarity,
            external_links: data
                .ext_urls
                .unwrap_or_default()
                .iter()
                .map(|u| normalize_url(u))
                .collect(),
        })
    }
}

#[async_trait]
impl ImageSearch for SauceNao {
    fn name(&self) -> &'static str {
        "SauceNAO"
    }

    async fn search(&self, payload: &ImagePayload) -> Result<Vec<SearchMatch>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::Configuration("SAUCENAO_API_KEY is not set".to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", payload.to_part()?)
            .text("api_key", api_key)
            .text("output_type", "2") // JSON output
            .text("numres", self.result_count.to_string());

        let response = self
            .network
            .post_multipart(&format!("{}/search.php", self.base_url), form)
            .await?;
        let response = ensure_success(self.name(), response).await?;

        let body = response.text().await?;
        let sauce_response: SauceNaoResponse = serde_json::from_str(&body).map_err(|e| {
            error!("SauceNAO response did not match the expected schema: {}", e);
            Error::from(e)
        })?;

        if sauce_response.header.status != 0 {
            let message = sauce_response
                .header
                .message
                .unwrap_or_else(|| "Unknown error".to_string());
            debug!(
                "SauceNAO header status {}: {}",
                sauce_response.header.status, message
            );
            return Err(Error::UpstreamUnavailable(format!(
                "SauceNAO status {}",
                sauce_response.header.status
            )));
        }

        sauce_response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(ResultItem::into_match)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> ImagePayload {
        ImagePayload::new(b"\x89PNG\r\n\x1a\n".to_vec(), "art.png", "image/png")
    }

    fn engine(server: &MockServer) -> SauceNao {
        SauceNao::with_base_url(Network::new().unwrap(), &server.uri(), Some("key".to_string()))
    }

    async fn respond(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_search_keeps_upstream_order() {
        let server = respond(json!({
            "header": { "status": 0, "results_returned": 2 },
            "results": [
                {
                    "header": { "similarity": "87.12", "thumbnail": "https://img3.saucenao.com/a.jpg", "index_name": "Index #5: Pixiv" },
                    "data": { "title": "Sunset", "member_name": "artist", "ext_urls": ["https://www.pixiv.net/artworks/1"] }
                },
                {
                    "header": { "similarity": "42.00", "thumbnail": "//img3.saucenao.com/b.jpg", "index_name": "Index #9: Danbooru" },
                    "data": { "source": "twitter.com/x", "author_name": "someone" }
                }
            ]
        }))
        .await;

        let matches = engine(&server).search(&payload()).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].similarity, 87.12);
        assert_eq!(matches[0].title, "Sunset");
        assert_eq!(matches[0].author_name.as_deref(), Some("artist"));
        assert_eq!(matches[0].external_links, ["https://www.pixiv.net/artworks/1"]);
        assert_eq!(matches[1].similarity, 42.0);
        assert_eq!(matches[1].title, "twitter.com/x");
        assert_eq!(matches[1].author_name.as_deref(), Some("someone"));
        assert_eq!(matches[1].thumbnail_url, "https://img3.saucenao.com/b.jpg");
        assert!(matches[1].external_links.is_empty());
    }

    #[tokio::test]
    async fn test_search_sends_fixed_parameters() {
        let server = respond(json!({ "header": { "status": 0 }, "results": [] })).await;

        let matches = engine(&server).with_result_count(5).search(&payload()).await.unwrap();
        assert!(matches.is_empty());

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\"; filename=\"art.png\""));
        assert!(body.contains("name=\"output_type\"\r\n\r\n2"));
        assert!(body.contains("name=\"numres\"\r\n\r\n5"));
        assert!(body.contains("name=\"api_key\"\r\n\r\nkey"));
    }

    #[tokio::test]
    async fn test_missing_results_is_empty_not_error() {
        let server = respond(json!({ "header": { "status": 0 } })).await;
        assert!(engine(&server).search(&payload()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let engine = SauceNao::with_base_url(Network::new().unwrap(), &server.uri(), None);
        let err = engine.search(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_upstream_failures_are_normalized() {
        let server = respond(json!({ "header": { "status": -2, "message": "Search Rate Too High." } })).await;
        let err = engine(&server).search(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        assert!(!err.to_string().contains("Rate Too High"));

        let server = respond(json!({ "unexpected": true })).await;
        let err = engine(&server).search(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamSchema(_)));

        let server = respond(json!({
            "header": { "status": 0 },
            "results": [{ "header": { "similarity": "high", "thumbnail": "x" }, "data": {} }]
        }))
        .await;
        let err = engine(&server).search(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamSchema(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
            .mount(&server)
            .await;
        let err = engine(&server).search(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }
}
