use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::backends::Source;

/// Algorithm name (as the registry spells it) → expected hex digest.
///
/// A `BTreeMap` keeps the lock file's key order stable across runs.
pub type Checksums = BTreeMap<String, String>;

/// A single downloadable file belonging to a resolved version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadArtifact {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub checksums: Checksums,
}

impl DownloadArtifact {
    pub fn new(url: impl Into<String>, filename: impl Into<String>, checksums: Checksums) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            checksums,
        }
    }
}

impl fmt::Display for DownloadArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.filename, self.url)
    }
}

/// One exact, self-describing version of a plugin or server.
///
/// Everything needed to download and verify it is carried in the record;
/// nothing is looked up again at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub source: Source,
    pub version: String,
    pub channel: String,
    pub downloads: Vec<DownloadArtifact>,
}

impl VersionRecord {
    pub fn new(
        name: impl Into<String>,
        source: Source,
        version: impl Into<String>,
        channel: impl Into<String>,
        downloads: Vec<DownloadArtifact>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            version: version.into(),
            channel: channel.into(),
            downloads,
        }
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.channel)?;
        for download in &self.downloads {
            write!(f, "\n- {}", download)?;
        }
        Ok(())
    }
}
