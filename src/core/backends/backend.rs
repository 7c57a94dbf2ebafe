use std::cmp::Ordering;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::geyser::GeyserBackend;
use super::hangar::HangarBackend;
use super::modrinth::ModrinthBackend;
use super::source::{ServerKind, Source};
use crate::core::artifact::VersionRecord;
use crate::core::error::{McpmError, McpmResult};

/// Candidate versions, most preferred first.
///
/// One-shot: pulling it again means asking the registry again. A bad entry
/// only fails when it is pulled, so callers taking the head are not affected
/// by the tail.
pub type VersionIter = Box<dyn Iterator<Item = McpmResult<VersionRecord>>>;

/// A registry that publishes plugin versions.
pub trait PluginBackend {
    /// Channel assumed when neither the manifest nor the lock names one.
    fn default_channel(&self) -> &'static str;

    /// Versions of `name` usable on `loader` for `game_version` in `channel`.
    ///
    /// An empty iterator means "nothing matches", never an error.
    fn iter_plugin_versions(
        &self,
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<VersionIter>;
}

/// A registry that publishes server jars.
pub trait ServerBackend {
    fn iter_server_versions(&self, server: ServerKind, game_version: &str) -> McpmResult<VersionIter>;

    fn latest_game_version(&self, server: ServerKind) -> McpmResult<String>;
}

/// Dispatcher over the plugin registries, chosen by `Source`.
pub enum Backend {
    Modrinth(ModrinthBackend),
    Hangar(HangarBackend),
    Geyser(GeyserBackend),
}

impl Backend {
    pub fn new(source: Source, client: Client) -> McpmResult<Self> {
        match source {
            Source::Modrinth => Ok(Self::Modrinth(ModrinthBackend::new(client))),
            Source::Hangar => Ok(Self::Hangar(HangarBackend::new(client))),
            Source::Geyser => Ok(Self::Geyser(GeyserBackend::new(client))),
            Source::Paper => Err(McpmError::NotAPluginRegistry(source)),
        }
    }

    pub fn default_channel(&self) -> &'static str {
        match self {
            Backend::Modrinth(b) => b.default_channel(),
            Backend::Hangar(b) => b.default_channel(),
            Backend::Geyser(b) => b.default_channel(),
        }
    }

    pub fn iter_plugin_versions(
        &self,
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<VersionIter> {
        match self {
            Backend::Modrinth(b) => b.iter_plugin_versions(name, loader, game_version, channel),
            Backend::Hangar(b) => b.iter_plugin_versions(name, loader, game_version, channel),
            Backend::Geyser(b) => b.iter_plugin_versions(name, loader, game_version, channel),
        }
    }
}

// ── Shared request plumbing ─────────────────────────────

/// Build `base` + `path` with query parameters, percent-encoding as needed.
pub(crate) fn api_url(base: &str, path: &str, params: &[(&str, String)]) -> McpmResult<Url> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse_with_params(&raw, params)
        .map_err(|e| McpmError::Other(format!("invalid registry URL {}: {}", raw, e)))
}

/// GET `url` and parse the body as JSON, whatever the status code.
///
/// Registries report their own errors in the body, so status handling is
/// left to the caller's shape checks. A body that is not JSON at all is a
/// registry error.
pub(crate) fn get_json(client: &Client, registry: Source, url: Url) -> McpmResult<Value> {
    debug!("GET {}", url);
    let response = client.get(url.clone()).send()?;
    let status = response.status();
    let body = response.text()?;

    serde_json::from_str(&body).map_err(|_| {
        McpmError::registry(
            registry,
            format!("HTTP {} from {} did not return JSON", status.as_u16(), url),
        )
    })
}

/// Decode a JSON value whose shape was already checked, turning serde
/// failures into registry errors.
pub(crate) fn decode<T: DeserializeOwned>(registry: Source, value: Value) -> McpmResult<T> {
    serde_json::from_value(value)
        .map_err(|e| McpmError::registry(registry, format!("unrecognized response: {}", e)))
}

/// Decode each list entry on its own so one malformed entry only fails
/// itself.
pub(crate) fn decode_each<T: DeserializeOwned>(registry: Source, items: Vec<Value>) -> Vec<McpmResult<T>> {
    items.into_iter().map(|item| decode(registry, item)).collect()
}

/// Stable sort, highest `key` first; entries that failed to decode go last.
pub(crate) fn sort_newest_first<T, K: Ord>(entries: &mut [McpmResult<T>], key: impl Fn(&T) -> K) {
    entries.sort_by(|a, b| match (a, b) {
        (Ok(a), Ok(b)) => key(b).cmp(&key(a)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    });
}

/// Render a JSON scalar without quotes.
pub(crate) fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
