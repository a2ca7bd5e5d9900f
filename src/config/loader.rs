use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Context, Result};

use super::{validator, FeedConfig};

/// Load `FeedConfig` overrides from a JSON file on top of the built-in defaults.
///
/// Every field in the file is optional; missing fields keep their defaults.
pub fn load_feed_config(path: &Path) -> Result<FeedConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read feed config JSON at {}", path.display()))?;

    let raw: RawFeedConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse feed config JSON at {}", path.display()))?;

    let config = raw.apply(FeedConfig::builtin());
    validator::validate_feed_config(&config)?;
    Ok(config)
}

impl FeedConfig {
    /// Built-in defaults, or defaults overridden by the JSON file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_feed_config(path),
            None => Ok(Self::builtin()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFeedConfig {
    #[serde(default)]
    websocket_url: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    timeout_secs: Option<f64>,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    sign_in_url: Option<String>,
    #[serde(default)]
    sign_in_referer: Option<String>,
    #[serde(default)]
    search_url_template: Option<String>,
}

impl RawFeedConfig {
    fn apply(self, mut config: FeedConfig) -> FeedConfig {
        if let Some(url) = self.websocket_url {
            config.websocket_url = url;
        }
        if let Some(origin) = self.origin {
            config.origin = origin;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(url) = self.sign_in_url {
            config.sign_in_url = url;
        }
        if let Some(referer) = self.sign_in_referer {
            config.sign_in_referer = referer;
        }
        if let Some(template) = self.search_url_template {
            config.search_url_template = template;
        }
        config
    }
}
