use crate::engines::SauceNao;
use crate::error::{Error, Result};
use crate::network::{Network, DEFAULT_TIMEOUT};
use crate::orchestrator::{Navigator, Services};
use crate::registry::EngineRegistry;
use crate::upload::{Catbox, FallbackPolicy, ImgBb, ProviderKind, Telegraph, UploadChain, UploadProvider};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROVIDERS: [ProviderKind; 2] = [ProviderKind::Catbox, ProviderKind::Telegraph];
/// Largest request body the HTTP endpoints accept (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Deployment settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub saucenao_api_key: Option<String>,
    pub saucenao_result_count: u32,
    pub imgbb_api_key: Option<String>,
    pub imgbb_expiration: Option<u64>,
    pub upload_providers: Vec<ProviderKind>,
    pub upload_policy: FallbackPolicy,
    pub http_timeout: Duration,
    pub proxy: Option<String>,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            saucenao_api_key: None,
            saucenao_result_count: crate::engines::saucenao::DEFAULT_RESULT_COUNT,
            imgbb_api_key: None,
            imgbb_expiration: None,
            upload_providers: DEFAULT_PROVIDERS.to_vec(),
            upload_policy: FallbackPolicy::default(),
            http_timeout: DEFAULT_TIMEOUT,
            proxy: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Configuration(format!("invalid {}={:?}: {}", name, value, e)))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Config {
            saucenao_api_key: var("SAUCENAO_API_KEY"),
            imgbb_api_key: var("IMGBB_API_KEY"),
            proxy: var("HTTP_PROXY_URL"),
            ..Config::default()
        };

        if let Some(v) = var("SAUCENAO_RESULT_COUNT") {
            config.saucenao_result_count = parse("SAUCENAO_RESULT_COUNT", &v)?;
            if config.saucenao_result_count == 0 {
                return Err(Error::Configuration(
                    "SAUCENAO_RESULT_COUNT must be at least 1".to_string(),
                ));
            }
        }
        if let Some(v) = var("IMGBB_EXPIRATION_SECS") {
            config.imgbb_expiration = Some(parse("IMGBB_EXPIRATION_SECS", &v)?);
        }
        if let Some(v) = var("UPLOAD_PROVIDERS") {
            config.upload_providers = v
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(|p| parse("UPLOAD_PROVIDERS", p))
                .collect::<Result<_>>()?;
        }
        if let Some(v) = var("UPLOAD_POLICY") {
            config.upload_policy = parse("UPLOAD_POLICY", &v)?;
        }
        if let Some(v) = var("HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse("HTTP_TIMEOUT_SECS", &v)?;
            if secs == 0 {
                return Err(Error::Configuration(
                    "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
                ));
            }
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(v) = var("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", &v)?;
            if config.max_upload_bytes == 0 {
                return Err(Error::Configuration(
                    "MAX_UPLOAD_BYTES must be at least 1".to_string(),
                ));
            }
        }

        Ok(config)
    }

    pub fn network(&self) -> Result<Network> {
        Network::with_options(self.http_timeout, self.proxy.as_deref())
    }

    /// Providers in configured priority order. ImgBB without a key is a
    /// configuration error here rather than at upload time.
    pub fn upload_chain(&self, network: &Network) -> Result<UploadChain> {
        let providers = self
            .upload_providers
            .iter()
            .map(|kind| -> Result<Arc<dyn UploadProvider>> {
                let provider: Arc<dyn UploadProvider> = match kind {
                    ProviderKind::Telegraph => Arc::new(Telegraph::new(network.clone())),
                    ProviderKind::Catbox => Arc::new(Catbox::new(network.clone())),
                    ProviderKind::ImgBb => {
                        if self.imgbb_api_key.is_none() {
                            return Err(Error::Configuration(
                                "imgbb is configured but IMGBB_API_KEY is not set".to_string(),
                            ));
                        }
                        Arc::new(
                            ImgBb::new(network.clone(), self.imgbb_api_key.clone())
                                .with_expiration(self.imgbb_expiration),
                        )
                    }
                };
                Ok(provider)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(UploadChain::new(providers, self.upload_policy))
    }

    pub fn inline_search(&self, network: &Network) -> SauceNao {
        SauceNao::new(network.clone(), self.saucenao_api_key.clone())
            .with_result_count(self.saucenao_result_count)
    }

    pub fn services(&self, navigator: Arc<dyn Navigator>) -> Result<Services> {
        let network = self.network()?;
        Ok(Services {
            registry: Arc::new(EngineRegistry::default()),
            uploader: Arc::new(self.upload_chain(&network)?),
            searcher: Arc::new(self.inline_search(&network)),
            navigator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.upload_providers, [ProviderKind::Catbox, ProviderKind::Telegraph]);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.saucenao_result_count, 3);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("SAUCENAO_API_KEY", "sauce"),
            ("SAUCENAO_RESULT_COUNT", "8"),
            ("IMGBB_API_KEY", "bb"),
            ("IMGBB_EXPIRATION_SECS", "600"),
            ("UPLOAD_PROVIDERS", "imgbb, telegraph"),
            ("UPLOAD_POLICY", "fail-fast"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("MAX_UPLOAD_BYTES", "1048576"),
        ])
        .unwrap();
        assert_eq!(config.saucenao_api_key.as_deref(), Some("sauce"));
        assert_eq!(config.saucenao_result_count, 8);
        assert_eq!(config.imgbb_expiration, Some(600));
        assert_eq!(config.upload_providers, [ProviderKind::ImgBb, ProviderKind::Telegraph]);
        assert_eq!(config.upload_policy, FallbackPolicy::FailFast);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 1024 * 1024);

        let chain = config.upload_chain(&config.network().unwrap()).unwrap();
        assert_eq!(chain.provider_names(), ["imgbb", "telegraph"]);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("SAUCENAO_API_KEY", "  "), ("UPLOAD_POLICY", "")]).unwrap();
        assert!(config.saucenao_api_key.is_none());
        assert_eq!(config.upload_policy, FallbackPolicy::Fallback);
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        for vars in [
            [("UPLOAD_PROVIDERS", "catbox,postimg")],
            [("UPLOAD_POLICY", "sometimes")],
            [("HTTP_TIMEOUT_SECS", "soon")],
            [("HTTP_TIMEOUT_SECS", "0")],
            [("SAUCENAO_RESULT_COUNT", "0")],
            [("MAX_UPLOAD_BYTES", "0")],
        ] {
            assert!(matches!(config_from(&vars), Err(Error::Configuration(_))), "{vars:?}");
        }
    }

    #[test]
    fn test_imgbb_without_key_is_rejected_at_startup() {
        let config = config_from(&[("UPLOAD_PROVIDERS", "imgbb")]).unwrap();
        let err = config.upload_chain(&config.network().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
