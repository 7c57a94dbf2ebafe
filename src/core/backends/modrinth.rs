use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::backend::{
    api_url, decode_each, get_json, plain, sort_newest_first, PluginBackend, VersionIter,
};
use super::source::{ServerKind, Source};
use crate::core::artifact::{Checksums, DownloadArtifact, VersionRecord};
use crate::core::error::{McpmError, McpmResult};

const MODRINTH_API_BASE: &str = "https://api.modrinth.com/v2";
const MODRINTH_DEFAULT_CHANNEL: &str = "release";

#[derive(Debug, Deserialize)]
pub struct ModrinthVersion {
    pub version_number: String,
    pub version_type: String,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<ModrinthFile>,
}

#[derive(Debug, Deserialize)]
pub struct ModrinthFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub hashes: Checksums,
    #[serde(default)]
    pub primary: bool,
}

/// Modrinth, the general-purpose plugin registry and the default source.
pub struct ModrinthBackend {
    client: Client,
}

impl ModrinthBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn versions_url(
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<reqwest::Url> {
        api_url(
            MODRINTH_API_BASE,
            &format!("/project/{}/version", name),
            &[
                ("loaders", format!("[\"{}\"]", loader)),
                ("game_versions", format!("[\"{}\"]", game_version)),
                ("version_type", channel.to_string()),
            ],
        )
    }

    /// Check the response shape and order versions newest first.
    ///
    /// Entries are decoded one by one; a malformed entry sorts last and only
    /// fails when it is reached.
    fn parse_versions(body: Value) -> McpmResult<Vec<McpmResult<ModrinthVersion>>> {
        let items = match body {
            Value::Array(items) => items,
            Value::Object(ref obj) => {
                return Err(match (obj.get("error"), obj.get("description")) {
                    (Some(error), Some(description)) => McpmError::registry(
                        Source::Modrinth,
                        format!("({}): {}", plain(error), plain(description)),
                    ),
                    _ => unknown_response(),
                })
            }
            _ => return Err(unknown_response()),
        };

        let mut versions = decode_each(Source::Modrinth, items);
        sort_newest_first(&mut versions, |v: &ModrinthVersion| v.date_published);
        Ok(versions)
    }

    fn to_record(version: ModrinthVersion, name: &str) -> McpmResult<VersionRecord> {
        // Old uploads sometimes flag no file as primary; fall back to the first.
        let files: Vec<ModrinthFile> = if version.files.iter().any(|f| f.primary) {
            version.files.into_iter().filter(|f| f.primary).collect()
        } else {
            version.files.into_iter().take(1).collect()
        };
        let downloads: Vec<DownloadArtifact> = files
            .into_iter()
            .map(|f| DownloadArtifact::new(f.url, f.filename, f.hashes))
            .collect();

        if downloads.is_empty() {
            return Err(McpmError::registry(
                Source::Modrinth,
                format!("version {} of {} has no files", version.version_number, name),
            ));
        }

        Ok(VersionRecord::new(
            name,
            Source::Modrinth,
            version.version_number,
            version.version_type,
            downloads,
        ))
    }
}

fn unknown_response() -> McpmError {
    McpmError::registry(
        Source::Modrinth,
        "An unknown error occurred. Results should be a list.",
    )
}

impl PluginBackend for ModrinthBackend {
    fn default_channel(&self) -> &'static str {
        MODRINTH_DEFAULT_CHANNEL
    }

    fn iter_plugin_versions(
        &self,
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<VersionIter> {
        let url = Self::versions_url(name, loader, game_version, channel)?;
        let versions = Self::parse_versions(get_json(&self.client, Source::Modrinth, url)?)?;
        debug!("Modrinth returned {} versions of {}", versions.len(), name);

        let name = name.to_string();
        Ok(Box::new(
            versions
                .into_iter()
                .map(move |version| version.and_then(|v| Self::to_record(v, &name))),
        ))
    }
}
