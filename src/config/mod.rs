use std::time::Duration;

pub mod loader;
pub mod validator;

pub use loader::load_feed_config;

const WEBSOCKET_URL: &str = "wss://prodata.tradingview.com/socket.io/websocket";
const WEBSOCKET_ORIGIN: &str = "https://fr.tradingview.com";
const SIGN_IN_URL: &str = "https://www.tradingview.com/accounts/signin/";
const SIGN_IN_REFERER: &str = "https://www.tradingview.com";
const SEARCH_URL_TEMPLATE: &str = "https://symbol-search.tradingview.com/symbol_search/?text={text}&hl=1&exchange={exchange}&lang=en&type=&domain=production";

/// Endpoints and protocol constants for the quote feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub websocket_url: String,
    /// The feed refuses handshakes from origins it does not recognise.
    pub origin: String,
    /// Applies to the TCP connect and to every websocket read.
    pub timeout: Duration,
    /// Bars requested by `create_series` and by each `request_more_data`.
    pub page_size: usize,
    pub sign_in_url: String,
    pub sign_in_referer: String,
    /// Search URL with `{text}` and `{exchange}` placeholders.
    pub search_url_template: String,
}

impl FeedConfig {
    pub fn builtin() -> Self {
        Self {
            websocket_url: WEBSOCKET_URL.to_string(),
            origin: WEBSOCKET_ORIGIN.to_string(),
            timeout: Duration::from_secs(5),
            page_size: 1000,
            sign_in_url: SIGN_IN_URL.to_string(),
            sign_in_referer: SIGN_IN_REFERER.to_string(),
            search_url_template: SEARCH_URL_TEMPLATE.to_string(),
        }
    }

    pub fn search_url(&self, text: &str, exchange: &str) -> String {
        self.search_url_template
            .replace("{text}", text)
            .replace("{exchange}", exchange)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Login material picked up from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    pub const USERNAME_VAR: &'static str = "TV_USERNAME";
    pub const PASSWORD_VAR: &'static str = "TV_PASSWORD";
    pub const AUTH_TOKEN_VAR: &'static str = "TV_AUTH_TOKEN";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            username: read(Self::USERNAME_VAR),
            password: read(Self::PASSWORD_VAR),
            auth_token: read(Self::AUTH_TOKEN_VAR),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
