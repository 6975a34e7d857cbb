use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Unexpected upstream response: {0}")]
    UpstreamSchema(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("All {} upload providers failed", .attempts.len())]
    AllProvidersFailed { attempts: Vec<UploadError> },

    #[error("No image selected")]
    NoImageSelected,

    #[error("A search is already in progress for this image")]
    SearchInProgress,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single provider's failure inside an upload chain.
#[derive(Error, Debug)]
#[error("{provider} upload failed: {reason}")]
pub struct UploadError {
    pub provider: String,
    #[source]
    pub reason: Box<Error>,
}

impl UploadError {
    pub fn new(provider: impl Into<String>, reason: Error) -> Self {
        Self {
            provider: provider.into(),
            reason: Box::new(reason),
        }
    }
}

impl Error {
    /// Whether a caller may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::UpstreamUnavailable(_)
            | Error::UpstreamTimeout(_)
            | Error::UpstreamSchema(_) => true,
            Error::Upload(e) => e.reason.is_retryable(),
            Error::AllProvidersFailed { attempts } => {
                attempts.iter().any(|a| a.reason.is_retryable())
            }
            _ => false,
        }
    }

    /// Short message safe to show an end user. Never includes upstream bodies.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Configuration(_) | Error::Template(_) => "search engine is not configured",
            Error::UpstreamUnavailable(_) | Error::UpstreamSchema(_) => "search failed",
            Error::UpstreamTimeout(_) => "search timed out",
            Error::Upload(_) | Error::AllProvidersFailed { .. } => {
                "image upload failed, could not create a link"
            }
            Error::NoImageSelected => "select an image first",
            Error::SearchInProgress => "a search is already running",
            Error::InvalidImage(_) => "file is not a supported image",
            Error::Io(_) => "could not read the image",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let target = e
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("upstream")
            .to_string();
        if e.is_timeout() {
            Error::UpstreamTimeout(target)
        } else if e.is_decode() {
            Error::UpstreamSchema(format!("{}: {}", target, e))
        } else if e.is_builder() {
            Error::Configuration(e.to_string())
        } else {
            Error::UpstreamUnavailable(format!("{}: {}", target, e))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::UpstreamSchema(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
