use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::backend::{
    api_url, decode, decode_each, get_json, plain, sort_newest_first, PluginBackend, VersionIter,
};
use super::source::{ServerKind, Source};
use crate::core::artifact::{Checksums, DownloadArtifact, VersionRecord};
use crate::core::error::{McpmError, McpmResult};

const HANGAR_API_BASE: &str = "https://hangar.papermc.io/api/v1";
const HANGAR_DEFAULT_CHANNEL: &str = "release";
const HANGAR_PAGE_SIZE: u64 = 25;

#[derive(Debug, Deserialize)]
pub struct HangarPage {
    pub pagination: HangarPagination,
    /// Decoded per entry by the caller.
    pub result: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HangarPagination {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangarVersion {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub channel: HangarChannel,
    #[serde(default)]
    pub downloads: HashMap<String, HangarDownload>,
}

#[derive(Debug, Deserialize)]
pub struct HangarChannel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangarDownload {
    /// Absent for downloads hosted elsewhere (`externalUrl`).
    pub file_info: Option<Map<String, Value>>,
    pub download_url: Option<String>,
}

/// Hangar, PaperMC's curated plugin registry.
pub struct HangarBackend {
    client: Client,
}

impl HangarBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Hangar groups downloads by platform, not by server fork.
    fn platform(loader: ServerKind) -> &'static str {
        match loader {
            ServerKind::Paper | ServerKind::Folia => "PAPER",
            ServerKind::Velocity => "VELOCITY",
            ServerKind::Waterfall | ServerKind::Travertine => "WATERFALL",
        }
    }

    fn versions_url(
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
        offset: u64,
    ) -> McpmResult<reqwest::Url> {
        api_url(
            HANGAR_API_BASE,
            &format!("/projects/{}/versions", name),
            &[
                ("platform", Self::platform(loader).to_string()),
                ("platformVersion", game_version.to_string()),
                ("channel", channel.to_string()),
                ("limit", HANGAR_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ],
        )
    }

    fn parse_page(body: Value) -> McpmResult<HangarPage> {
        if let Some(http_error) = body.get("httpError") {
            let status = http_error.get("statusCode").map(plain).unwrap_or_default();
            let message = body.get("message").map(plain).unwrap_or_default();
            return Err(McpmError::registry(
                Source::Hangar,
                format!("({}): {}", status, message),
            ));
        }
        if body.get("result").is_none() {
            return Err(McpmError::registry(
                Source::Hangar,
                "An unknown error occurred. Json structure unrecognized.",
            ));
        }
        decode(Source::Hangar, body)
    }

    /// `None` when this version has nothing verifiable for the platform.
    fn to_record(version: HangarVersion, name: &str, loader: ServerKind) -> Option<VersionRecord> {
        let mut downloads = version.downloads;
        let download = downloads.remove(Self::platform(loader))?;
        let file_info = download.file_info?;
        let url = download.download_url?;

        let filename = file_info.get("name").and_then(Value::as_str)?.to_string();
        let checksums: Checksums = file_info
            .iter()
            .filter_map(|(key, value)| {
                let algorithm = key.strip_suffix("Hash")?;
                Some((algorithm.to_string(), value.as_str()?.to_string()))
            })
            .collect();

        Some(VersionRecord::new(
            name,
            Source::Hangar,
            version.name,
            version.channel.name,
            vec![DownloadArtifact::new(url, filename, checksums)],
        ))
    }
}

impl PluginBackend for HangarBackend {
    fn default_channel(&self) -> &'static str {
        HANGAR_DEFAULT_CHANNEL
    }

    fn iter_plugin_versions(
        &self,
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<VersionIter> {
        let mut items: Vec<Value> = Vec::new();
        loop {
            let offset = items.len() as u64;
            let url = Self::versions_url(name, loader, game_version, channel, offset)?;
            let page = Self::parse_page(get_json(&self.client, Source::Hangar, url)?)?;
            let fetched = page.result.len();
            items.extend(page.result);

            if !needs_another_page(fetched, items.len(), page.pagination.count) {
                break;
            }
        }
        debug!("Hangar returned {} versions of {}", items.len(), name);

        let mut versions = decode_each(Source::Hangar, items);
        sort_newest_first(&mut versions, |v: &HangarVersion| v.created_at);
        let name = name.to_string();
        Ok(Box::new(versions.into_iter().filter_map(move |version| match version {
            Ok(version) => Self::to_record(version, &name, loader).map(Ok),
            Err(e) => Some(Err(e)),
        })))
    }
}

/// Keep paging while the last page had entries and the total is not reached.
fn needs_another_page(fetched: usize, collected: usize, count: u64) -> bool {
    fetched > 0 && (collected as u64) < count
}
