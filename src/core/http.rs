use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};

/// Some registries and CDNs reject tooling user agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Blocking client shared by every backend and the downloader.
///
/// No timeout is configured: a stalled registry stalls the command until
/// the operator interrupts it.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(default_headers)
        .timeout(None::<Duration>)
        .build()
}
