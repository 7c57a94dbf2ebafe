// ─── Fill ───
// PaperMC's build service. Serves paper, folia, velocity, waterfall and
// travertine server jars.

use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::backend::{
    api_url, decode, decode_each, get_json, plain, sort_newest_first, ServerBackend, VersionIter,
};
use super::ordering::{compare_versions, is_prerelease};
use super::source::{ServerKind, Source};
use crate::core::artifact::{Checksums, DownloadArtifact, VersionRecord};
use crate::core::error::{McpmError, McpmResult};

const FILL_API_BASE: &str = "https://fill.papermc.io/v3";
const FILL_SERVER_CHANNEL: &str = "STABLE";
const FILL_SERVER_DOWNLOAD: &str = "server:default";

#[derive(Debug, Deserialize)]
pub struct FillVersions {
    pub versions: Vec<FillVersionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FillVersionEntry {
    pub version: FillVersionId,
}

#[derive(Debug, Deserialize)]
pub struct FillVersionId {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct FillBuild {
    pub id: u64,
    pub channel: String,
    #[serde(default)]
    pub downloads: HashMap<String, FillDownload>,
}

#[derive(Debug, Deserialize)]
pub struct FillDownload {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub checksums: Checksums,
}

pub struct FillBackend {
    client: Client,
}

impl FillBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fill reports failures as `{"error": ..., "message": ...}`.
    fn check_error(body: Value) -> McpmResult<Value> {
        if let Some(error) = body.get("error") {
            let message = body.get("message").map(plain).unwrap_or_default();
            return Err(McpmError::registry(
                Source::Paper,
                format!("({}): {}", plain(error), message),
            ));
        }
        Ok(body)
    }

    /// Highest release id; pre-releases only count when nothing else exists.
    fn newest_game_version(versions: &FillVersions) -> Option<&str> {
        let ids = || versions.versions.iter().map(|v| v.version.id.as_str());
        ids()
            .filter(|id| !is_prerelease(id))
            .max_by(|a, b| compare_versions(a, b))
            .or_else(|| ids().max_by(|a, b| compare_versions(a, b)))
    }

    /// Builds newest first; a build that fails to decode sorts last.
    fn parse_builds(body: Value) -> McpmResult<Vec<McpmResult<FillBuild>>> {
        let Value::Array(items) = Self::check_error(body)? else {
            return Err(McpmError::registry(
                Source::Paper,
                "An unknown error occurred. Results should be a list.",
            ));
        };
        let mut builds = decode_each(Source::Paper, items);
        sort_newest_first(&mut builds, |b: &FillBuild| b.id);
        Ok(builds)
    }

    fn to_record(build: FillBuild, server: ServerKind, game_version: &str) -> McpmResult<VersionRecord> {
        let mut downloads = build.downloads;
        let file = downloads.remove(FILL_SERVER_DOWNLOAD).ok_or_else(|| {
            McpmError::registry(
                Source::Paper,
                format!("build {} of {} {} has no server download", build.id, server, game_version),
            )
        })?;

        Ok(VersionRecord::new(
            server.as_str(),
            Source::Paper,
            format!("{}-{}", game_version, build.id),
            build.channel,
            vec![DownloadArtifact::new(file.url, file.name, file.checksums)],
        ))
    }
}

impl ServerBackend for FillBackend {
    fn iter_server_versions(&self, server: ServerKind, game_version: &str) -> McpmResult<VersionIter> {
        let url = api_url(
            FILL_API_BASE,
            &format!("/projects/{}/versions/{}/builds", server, game_version),
            &[("channel", FILL_SERVER_CHANNEL.to_string())],
        )?;
        let builds = Self::parse_builds(get_json(&self.client, Source::Paper, url)?)?;
        debug!("Fill returned {} {} builds for {}", builds.len(), server, game_version);

        let game_version = game_version.to_string();
        Ok(Box::new(
            builds
                .into_iter()
                .map(move |build| build.and_then(|b| Self::to_record(b, server, &game_version))),
        ))
    }

    fn latest_game_version(&self, server: ServerKind) -> McpmResult<String> {
        let url = api_url(FILL_API_BASE, &format!("/projects/{}/versions", server), &[])?;
        let body = Self::check_error(get_json(&self.client, Source::Paper, url)?)?;
        let versions: FillVersions = decode(Source::Paper, body)?;

        let latest = Self::newest_game_version(&versions).ok_or_else(|| {
            McpmError::registry(Source::Paper, format!("no versions published for {}", server))
        })?;
        info!("Latest Minecraft version for {} is {}", server, latest);
        Ok(latest.to_string())
    }
}
