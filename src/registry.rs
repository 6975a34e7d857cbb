use crate::error::{Error, Result};
use crate::types::{EngineMode, SearchEngineDescriptor};
use crate::utils::url_encode;
use std::collections::HashSet;
use url::Url;

pub const URL_PLACEHOLDER: &str = "{url}";

/// The engines offered out of the box, in display order.
pub fn builtin_engines() -> Vec<SearchEngineDescriptor> {
    vec![
        SearchEngineDescriptor::inline("saucenao_api", "SauceNAO (inline)"),
        SearchEngineDescriptor::redirect(
            "google_lens",
            "Google Lens",
            "https://lens.google.com/upload?url={url}",
        ),
        SearchEngineDescriptor::redirect(
            "yandex_url",
            "Yandex",
            "https://yandex.com/images/search?rpt=imageview&url={url}",
        ),
        SearchEngineDescriptor::redirect(
            "ascii2d_url",
            "Ascii2d",
            "https://ascii2d.net/search/url/{url}",
        ),
        SearchEngineDescriptor::redirect(
            "saucenao_url",
            "SauceNAO (redirect)",
            "https://saucenao.com/search.php?db=999&url={url}",
        ),
        SearchEngineDescriptor::redirect("iqdb_url", "IQDB", "https://iqdb.org/?url={url}"),
    ]
}

/// Read-only catalog of search engines, validated on construction.
#[derive(Debug, Clone)]
pub struct EngineRegistry {
    engines: Vec<SearchEngineDescriptor>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self {
            engines: builtin_engines(),
        }
    }
}

impl EngineRegistry {
    pub fn new(engines: Vec<SearchEngineDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for engine in &engines {
            if !seen.insert(engine.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate search engine id: {}",
                    engine.id
                )));
            }
            match (engine.mode, engine.url_template.as_deref()) {
                (EngineMode::Redirect, Some(template)) => validate_template(&engine.id, template)?,
                (EngineMode::Redirect, None) => {
                    return Err(Error::Template(format!(
                        "redirect engine {} has no URL template",
                        engine.id
                    )))
                }
                (EngineMode::Inline, Some(_)) => {
                    return Err(Error::Template(format!(
                        "inline engine {} must not carry a URL template",
                        engine.id
                    )))
                }
                (EngineMode::Inline, None) => {}
            }
        }
        Ok(Self { engines })
    }

    pub fn list(&self) -> &[SearchEngineDescriptor] {
        &self.engines
    }

    pub fn resolve(&self, id: &str) -> Result<&SearchEngineDescriptor> {
        self.engines
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::Configuration(format!("unknown search engine: {}", id)))
    }
}

fn validate_template(id: &str, template: &str) -> Result<()> {
    let placeholders = template.matches(URL_PLACEHOLDER).count();
    if placeholders != 1 {
        return Err(Error::Template(format!(
            "template for {} must contain exactly one {} placeholder, found {}",
            id, URL_PLACEHOLDER, placeholders
        )));
    }
    Url::parse(&template.replace(URL_PLACEHOLDER, "x"))
        .map_err(|e| Error::Template(format!("template for {} is not an absolute URL: {}", id, e)))?;
    Ok(())
}

/// Substitute the percent-encoded `image_url` into a redirect engine's template.
pub fn build_redirect_target(descriptor: &SearchEngineDescriptor, image_url: &str) -> Result<String> {
    let template = match (descriptor.mode, descriptor.url_template.as_deref()) {
        (EngineMode::Redirect, Some(template)) => template,
        (EngineMode::Inline, _) => {
            return Err(Error::Template(format!(
                "{} is not a redirect engine",
                descriptor.id
            )))
        }
        (EngineMode::Redirect, None) => {
            return Err(Error::Template(format!(
                "redirect engine {} has no URL template",
                descriptor.id
            )))
        }
    };
    validate_template(&descriptor.id, template)?;

    let target = template.replace(URL_PLACEHOLDER, &url_encode(image_url));
    Url::parse(&target)
        .map_err(|e| Error::Template(format!("built target is not a URL: {}", e)))?;
    Ok(target)
}
