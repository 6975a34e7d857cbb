use crate::error::{Error, Result};
use url::Url;

pub fn url_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

pub fn url_decode(s: &str) -> Result<String> {
    urlencoding::decode(s)
        .map(|d| d.into_owned())
        .map_err(|e| Error::Template(format!("invalid percent-encoding: {}", e)))
}

pub fn normalize_url(url: &str) -> String {
    if url.starts_with("//") {
        return format!("https:{}", url);
    }
    url.to_string()
}

/// Checks that `candidate` is an absolute http(s) URL with a host and
/// returns it trimmed, otherwise as the provider sent it.
pub fn ensure_absolute_url(candidate: &str) -> Result<String> {
    let candidate = candidate.trim();
    let parsed = Url::parse(candidate)
        .map_err(|e| Error::UpstreamSchema(format!("not an absolute URL ({}): {}", e, candidate)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(candidate.to_string()),
        _ => Err(Error::UpstreamSchema(format!(
            "unsupported URL: {}",
            candidate
        ))),
    }
}
