use super::UploadProvider;
use crate::error::{Error, Result, UploadError};
use crate::types::{ImagePayload, UploadResult};
use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;

/// What to do when a provider in the chain fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Try the next provider with the same payload.
    #[default]
    Fallback,
    /// Surface the first failure.
    FailFast,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(FallbackPolicy::Fallback),
            "fail-fast" | "failfast" | "stop" => Ok(FallbackPolicy::FailFast),
            other => Err(format!("unknown upload policy: {}", other)),
        }
    }
}

/// Ordered list of image hosts tried in priority order.
#[derive(Clone)]
pub struct UploadChain {
    providers: Vec<Arc<dyn UploadProvider>>,
    policy: FallbackPolicy,
}

impl std::fmt::Debug for UploadChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadChain")
            .field("providers", &self.provider_names())
            .field("policy", &self.policy)
            .finish()
    }
}

impl UploadChain {
    pub fn new(providers: Vec<Arc<dyn UploadProvider>>, policy: FallbackPolicy) -> Self {
        Self { providers, policy }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Upload `payload` to the first provider that accepts it.
    ///
    /// With [`FallbackPolicy::Fallback`] every provider is tried once, in
    /// order, and `AllProvidersFailed` lists each failure in the same order.
    /// With [`FallbackPolicy::FailFast`] the first failure is returned as is.
    pub async fn resolve_url(&self, payload: &ImagePayload) -> Result<UploadResult> {
        if self.providers.is_empty() {
            return Err(Error::Configuration(
                "no upload providers configured".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for provider in &self.providers {
            info!("Uploading {} via {}", payload.file_name(), provider.name());
            match provider.upload(payload).await {
                Ok(result) => {
                    info!("{} hosted image at {}", provider.name(), result.url);
                    return Ok(result);
                }
                Err(e) => {
                    warn!("{} upload failed: {}", provider.name(), e);
                    let failure = UploadError::new(provider.name(), e);
                    if self.policy == FallbackPolicy::FailFast {
                        return Err(failure.into());
                    }
                    attempts.push(failure);
                }
            }
        }

        Err(Error::AllProvidersFailed { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeHost {
        name: &'static str,
        url: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeHost {
        fn ok(name: &'static str, url: &'static str) -> Arc<Self> {
            Arc::new(Self { name, url: Some(url), calls: AtomicUsize::new(0) })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, url: None, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl UploadProvider for FakeHost {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn upload(&self, _payload: &ImagePayload) -> Result<UploadResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.url {
                Some(url) => Ok(UploadResult { url: url.to_string() }),
                None => Err(Error::UpstreamUnavailable(format!("{} is down", self.name))),
            }
        }
    }

    fn payload() -> ImagePayload {
        ImagePayload::new(b"\xFF\xD8\xFF".to_vec(), "a.jpg", "image/jpeg")
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let a = FakeHost::failing("a");
        let b = FakeHost::ok("b", "https://b.example/x.jpg");
        let chain = UploadChain::new(vec![a.clone(), b.clone()], FallbackPolicy::Fallback);

        let result = chain.resolve_url(&payload()).await.unwrap();
        assert_eq!(result.url, "https://b.example/x.jpg");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_success() {
        let a = FakeHost::ok("a", "https://a.example/x.jpg");
        let b = FakeHost::ok("b", "https://b.example/x.jpg");
        let chain = UploadChain::new(vec![a.clone(), b.clone()], FallbackPolicy::Fallback);

        assert_eq!(chain.resolve_url(&payload()).await.unwrap().url, "https://a.example/x.jpg");
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failed_lists_attempts_in_order() {
        let chain = UploadChain::new(
            vec![FakeHost::failing("a"), FakeHost::failing("b"), FakeHost::failing("c")],
            FallbackPolicy::Fallback,
        );

        match chain.resolve_url(&payload()).await {
            Err(Error::AllProvidersFailed { attempts }) => {
                let names: Vec<_> = attempts.iter().map(|a| a.provider.as_str()).collect();
                assert_eq!(names, ["a", "b", "c"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let b = FakeHost::ok("b", "https://b.example/x.jpg");
        let chain = UploadChain::new(vec![FakeHost::failing("a"), b.clone()], FallbackPolicy::FailFast);

        match chain.resolve_url(&payload()).await {
            Err(Error::Upload(e)) => assert_eq!(e.provider, "a"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_is_configuration_error() {
        let chain = UploadChain::new(Vec::new(), FallbackPolicy::Fallback);
        assert!(matches!(
            chain.resolve_url(&payload()).await,
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("fallback".parse(), Ok(FallbackPolicy::Fallback));
        assert_eq!("Fail-Fast".parse(), Ok(FallbackPolicy::FailFast));
        assert!("random".parse::<FallbackPolicy>().is_err());
    }
}
