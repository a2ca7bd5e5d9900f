use reqwest::header::ORIGIN;
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::error::{Context, Result};

use super::auth::build_blocking_client;

/// One hit returned by the symbol search endpoint.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SymbolDescriptor {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

impl SymbolDescriptor {
    /// `EXCHANGE:SYMBOL`, ready to pass back into a history request.
    pub fn qualified(&self) -> String {
        if self.exchange.is_empty() {
            self.symbol.clone()
        } else {
            format!("{}:{}", self.exchange, self.symbol)
        }
    }
}

/// Search the feed's symbol directory. Any failure is logged and yields an empty list.
pub fn search_symbols(config: &FeedConfig, text: &str, exchange: &str) -> Vec<SymbolDescriptor> {
    match request_search(config, text, exchange) {
        Ok(symbols) => symbols,
        Err(err) => {
            log::error!("symbol search for `{text}` failed: {err}");
            Vec::new()
        }
    }
}

fn request_search(config: &FeedConfig, text: &str, exchange: &str) -> Result<Vec<SymbolDescriptor>> {
    let client = build_blocking_client()?;
    let url = config.search_url(text, exchange);

    let body = client
        .get(&url)
        .header(ORIGIN, config.origin.as_str())
        .send()
        .with_context(|| format!("Search request failed for {text}"))?
        .text()
        .with_context(|| format!("Failed to read search body for {text}"))?;

    parse_search_body(&body)
}

fn parse_search_body(body: &str) -> Result<Vec<SymbolDescriptor>> {
    let cleaned = body.replace("<em>", "").replace("</em>", "");
    Ok(serde_json::from_str(&cleaned).context("Failed to parse symbol search JSON")?)
}
