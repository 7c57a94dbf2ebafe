use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::backend::{api_url, decode, get_json, plain, PluginBackend, VersionIter};
use super::ordering::compare_versions;
use super::source::{ServerKind, Source};
use crate::core::artifact::{Checksums, DownloadArtifact, VersionRecord};
use crate::core::error::{McpmError, McpmResult};

const GEYSER_API_BASE: &str = "https://download.geysermc.org/v2";
const GEYSER_DEFAULT_CHANNEL: &str = "default";

#[derive(Debug, Deserialize)]
pub struct GeyserProject {
    pub versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeyserVersion {
    pub builds: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct GeyserBuild {
    #[serde(default)]
    pub downloads: HashMap<String, GeyserDownload>,
}

#[derive(Debug, Deserialize)]
pub struct GeyserDownload {
    pub name: String,
    /// Every other field is a digest keyed by algorithm (`sha256`).
    #[serde(flatten)]
    pub checksums: HashMap<String, Value>,
}

/// GeyserMC's download API (Geyser, Floodgate and friends).
///
/// The API only exposes "newest" implicitly, so the backend picks the single
/// best build itself: highest project version, then highest build number.
pub struct GeyserBackend {
    client: Client,
}

impl GeyserBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download key Geyser uses for each server family.
    fn platform(loader: ServerKind) -> &'static str {
        match loader {
            ServerKind::Paper | ServerKind::Folia => "spigot",
            ServerKind::Velocity => "velocity",
            ServerKind::Waterfall | ServerKind::Travertine => "bungeecord",
        }
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> McpmResult<T> {
        let url = api_url(GEYSER_API_BASE, path, &[])?;
        let body = get_json(&self.client, Source::Geyser, url)?;
        decode(Source::Geyser, Self::check_error(body)?)
    }

    fn check_error(body: Value) -> McpmResult<Value> {
        match body.get("error") {
            Some(error) => Err(McpmError::registry(Source::Geyser, plain(error))),
            None => Ok(body),
        }
    }

    fn newest_version(project: &GeyserProject) -> Option<&str> {
        project
            .versions
            .iter()
            .max_by(|a, b| compare_versions(a, b))
            .map(String::as_str)
    }

    fn newest_build(version: &GeyserVersion) -> Option<u64> {
        version.builds.iter().copied().max()
    }

    /// `Geyser-Spigot.jar` → `Geyser-Spigot-2.6.0-750.jar`
    fn versioned_filename(filename: &str, full_version: &str) -> String {
        match filename.rfind('.') {
            Some(idx) => format!("{}-{}{}", &filename[..idx], full_version, &filename[idx..]),
            None => format!("{}-{}", filename, full_version),
        }
    }

    fn to_record(
        project: &str,
        version: &str,
        build: u64,
        platform: &str,
        download: GeyserDownload,
        channel: &str,
    ) -> VersionRecord {
        let full_version = format!("{}-{}", version, build);
        let url = format!(
            "{}/projects/{}/versions/{}/builds/{}/downloads/{}",
            GEYSER_API_BASE, project, version, build, platform
        );
        let checksums: Checksums = download
            .checksums
            .into_iter()
            .filter_map(|(algorithm, digest)| Some((algorithm, digest.as_str()?.to_string())))
            .collect();

        VersionRecord::new(
            project,
            Source::Geyser,
            full_version.clone(),
            channel,
            vec![DownloadArtifact::new(
                url,
                Self::versioned_filename(&download.name, &full_version),
                checksums,
            )],
        )
    }
}

impl PluginBackend for GeyserBackend {
    fn default_channel(&self) -> &'static str {
        GEYSER_DEFAULT_CHANNEL
    }

    fn iter_plugin_versions(
        &self,
        name: &str,
        loader: ServerKind,
        game_version: &str,
        channel: &str,
    ) -> McpmResult<VersionIter> {
        // Geyser builds track the newest Minecraft release; the API has no
        // per-game-version filter.
        debug!("GeyserMC ignores game version {} for {}", game_version, name);

        let project: GeyserProject = self.fetch(&format!("/projects/{}", name))?;
        let Some(version) = Self::newest_version(&project) else {
            return Ok(Box::new(std::iter::empty()));
        };

        let builds: GeyserVersion = self.fetch(&format!("/projects/{}/versions/{}", name, version))?;
        let Some(build) = Self::newest_build(&builds) else {
            return Ok(Box::new(std::iter::empty()));
        };

        let platform = Self::platform(loader);
        let mut info: GeyserBuild = self.fetch(&format!(
            "/projects/{}/versions/{}/builds/{}",
            name, version, build
        ))?;
        let Some(download) = info.downloads.remove(platform) else {
            info!("GeyserMC {} {}-{} has no {} download", name, version, build, platform);
            return Ok(Box::new(std::iter::empty()));
        };

        let record = Self::to_record(name, version, build, platform, download, channel);
        Ok(Box::new(std::iter::once(Ok(record))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newest_version_and_build_use_numeric_order() {
        let project: GeyserProject =
            serde_json::from_value(json!({"versions": ["2.10.0", "2.9.1", "2.2.3"]})).unwrap();
        assert_eq!(GeyserBackend::newest_version(&project), Some("2.10.0"));

        let version: GeyserVersion =
            serde_json::from_value(json!({"builds": [98, 120, 101]})).unwrap();
        assert_eq!(GeyserBackend::newest_build(&version), Some(120));
    }

    #[test]
    fn filename_gets_the_full_version_before_the_extension() {
        assert_eq!(
            GeyserBackend::versioned_filename("Geyser-Spigot.jar", "2.6.0-750"),
            "Geyser-Spigot-2.6.0-750.jar"
        );
        assert_eq!(
            GeyserBackend::versioned_filename("floodgate", "2.2.3-110"),
            "floodgate-2.2.3-110"
        );
    }

    #[test]
    fn build_info_becomes_a_record() {
        let mut build: GeyserBuild = serde_json::from_value(json!({
            "project_id": "geyser",
            "build": 750,
            "downloads": {
                "spigot": {"name": "Geyser-Spigot.jar", "sha256": "ff00"},
                "velocity": {"name": "Geyser-Velocity.jar", "sha256": "ee11"}
            }
        }))
        .unwrap();
        let platform = GeyserBackend::platform(ServerKind::Paper);
        let download = build.downloads.remove(platform).unwrap();

        let record = GeyserBackend::to_record("geyser", "2.6.0", 750, platform, download, "default");
        assert_eq!(record.source, Source::Geyser);
        assert_eq!(record.version, "2.6.0-750");
        assert_eq!(record.channel, "default");
        let artifact = &record.downloads[0];
        assert_eq!(artifact.filename, "Geyser-Spigot-2.6.0-750.jar");
        assert_eq!(
            artifact.url,
            "https://download.geysermc.org/v2/projects/geyser/versions/2.6.0/builds/750/downloads/spigot"
        );
        assert_eq!(artifact.checksums.len(), 1);
        assert_eq!(artifact.checksums["sha256"], "ff00");
    }

    #[test]
    fn platforms_cover_every_loader() {
        assert_eq!(GeyserBackend::platform(ServerKind::Velocity), "velocity");
        assert_eq!(GeyserBackend::platform(ServerKind::Waterfall), "bungeecord");
    }

    #[test]
    fn error_field_becomes_registry_error() {
        let err = GeyserBackend::check_error(json!({"error": "Project not found"})).unwrap_err();
        assert_eq!(err.to_string(), "The GeyserMC API returned an error: Project not found");
    }
}
