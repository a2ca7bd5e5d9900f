use crate::error::{AppError, Result};

use super::FeedConfig;

/// Validate a feed configuration and surface every problem at once.
pub fn validate_feed_config(config: &FeedConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_urls(config, &mut issues);
    validate_limits(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "feed config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_urls(config: &FeedConfig, issues: &mut Vec<String>) {
    let ws = config.websocket_url.trim();
    if ws.is_empty() {
        issues.push("websocket_url must not be empty".to_string());
    } else if !(ws.starts_with("wss://") || ws.starts_with("ws://")) {
        issues.push(format!("websocket_url `{ws}` must use ws:// or wss://"));
    }

    if config.origin.trim().is_empty() {
        issues.push("origin must not be empty".to_string());
    }
    if config.sign_in_url.trim().is_empty() {
        issues.push("sign_in_url must not be empty".to_string());
    }

    let template = &config.search_url_template;
    if !template.contains("{text}") {
        issues.push("search_url_template must contain `{text}`".to_string());
    }
}

fn validate_limits(config: &FeedConfig, issues: &mut Vec<String>) {
    if config.page_size == 0 {
        issues.push("page_size must be greater than zero".to_string());
    }
    if config.timeout.is_zero() {
        issues.push("timeout_secs must be greater than zero".to_string());
    }
}
