use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::REFERER;
use serde::Deserialize;

use crate::config::FeedConfig;
use crate::error::{AppError, Context, Result};

#[derive(Debug, Deserialize)]
struct SignInResponse {
    user: SignInUser,
}

#[derive(Debug, Deserialize)]
struct SignInUser {
    auth_token: String,
}

/// Sign in with form credentials and return the session's auth token.
///
/// Never fails: network errors and responses without a token are logged and
/// reported as `None`, leaving the caller to fall back to anonymous access.
pub fn login(config: &FeedConfig, username: &str, password: &str) -> Option<String> {
    match request_token(config, username, password) {
        Ok(token) => Some(token),
        Err(err) => {
            log::error!("error while signin: {err}");
            None
        }
    }
}

fn request_token(config: &FeedConfig, username: &str, password: &str) -> Result<String> {
    let client = build_blocking_client()?;

    let response = client
        .post(&config.sign_in_url)
        .header(REFERER, config.sign_in_referer.as_str())
        .form(&[
            ("username", username),
            ("password", password),
            ("remember", "on"),
        ])
        .send()
        .context("Failed to send sign-in request")?;

    let body = response.text().context("Failed to read sign-in response")?;
    parse_sign_in(&body)
}

fn parse_sign_in(body: &str) -> Result<String> {
    let parsed: SignInResponse =
        serde_json::from_str(body).context("Sign-in response carried no auth token")?;
    if parsed.user.auth_token.is_empty() {
        return Err(AppError::message("Sign-in returned an empty auth token"));
    }
    Ok(parsed.user.auth_token)
}

pub(crate) fn build_blocking_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to construct blocking HTTP client")?)
}
