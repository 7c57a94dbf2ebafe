use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::core::backends::{ServerKind, Source};
use crate::core::error::{McpmError, McpmResult};

pub const DEFAULT_LOADER: ServerKind = ServerKind::Paper;
pub const DEFAULT_VERSION: &str = "latest";

/// Target Minecraft version as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameVersion {
    /// Whatever the server registry currently calls newest.
    Latest,
    Exact(String),
}

impl FromStr for GameVersion {
    type Err = McpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(McpmError::Manifest("server.version must not be empty".into()));
        }
        if s.eq_ignore_ascii_case(DEFAULT_VERSION) {
            Ok(GameVersion::Latest)
        } else {
            Ok(GameVersion::Exact(s.to_string()))
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameVersion::Latest => f.write_str(DEFAULT_VERSION),
            GameVersion::Exact(v) => f.write_str(v),
        }
    }
}

/// One `plugins` entry: `[source/]name[#channel]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub name: String,
    pub source: Option<Source>,
    pub channel: Option<String>,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            channel: None,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// True when `query` names this entry. Parts the query leaves out match
    /// anything.
    pub fn matches(&self, query: &PluginEntry) -> bool {
        self.name == query.name
            && query.source.map_or(true, |s| self.source == Some(s))
            && query.channel.as_ref().map_or(true, |c| self.channel.as_ref() == Some(c))
    }
}

impl FromStr for PluginEntry {
    type Err = McpmError;

    fn from_str(full_name: &str) -> Result<Self, Self::Err> {
        let full_name = full_name.trim();
        let (source, rest) = match full_name.split_once('/') {
            Some((source, rest)) => (Some(source.parse::<Source>()?), rest),
            None => (None, full_name),
        };
        let (name, channel) = match rest.rsplit_once('#') {
            Some((name, channel)) => (name, Some(channel)),
            None => (rest, None),
        };

        if name.is_empty() {
            return Err(McpmError::Manifest(format!(
                "plugin entry '{}' has no name",
                full_name
            )));
        }
        if let Some(source) = source {
            if !source.is_plugin_registry() {
                return Err(McpmError::Manifest(format!(
                    "plugin entry '{}': {} is not a plugin registry",
                    full_name, source
                )));
            }
        }
        if channel == Some("") {
            return Err(McpmError::Manifest(format!(
                "plugin entry '{}' has an empty channel",
                full_name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            source,
            channel: channel.map(str::to_string),
        })
    }
}

impl fmt::Display for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source {
            write!(f, "{}/", source.as_str())?;
        }
        f.write_str(&self.name)?;
        if let Some(channel) = &self.channel {
            write!(f, "#{}", channel)?;
        }
        Ok(())
    }
}

/// The decoded manifest: what the user wants installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub loader: ServerKind,
    pub version: GameVersion,
    pub plugins: Vec<PluginEntry>,
}

impl Manifest {
    pub fn new(loader: ServerKind, version: GameVersion) -> Self {
        Self {
            loader,
            version,
            plugins: Vec::new(),
        }
    }

    /// Reject two entries resolving to the same logical name.
    pub fn validate(&self) -> McpmResult<()> {
        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            if !seen.insert(plugin.name.as_str()) {
                return Err(McpmError::DuplicatePlugin(plugin.name.clone()));
            }
        }
        Ok(())
    }

    pub fn declares(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new(DEFAULT_LOADER, GameVersion::Latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_name() {
        let entry: PluginEntry = "luckperms".parse().unwrap();
        assert_eq!(entry, PluginEntry::new("luckperms"));
    }

    #[test]
    fn parse_source_name_and_channel() {
        let entry: PluginEntry = "hangar/ViaVersion#Snapshot".parse().unwrap();
        assert_eq!(entry.name, "ViaVersion");
        assert_eq!(entry.source, Some(Source::Hangar));
        assert_eq!(entry.channel.as_deref(), Some("Snapshot"));
        assert_eq!(entry.to_string(), "hangar/ViaVersion#Snapshot");
    }

    #[test]
    fn channel_splits_on_the_last_hash() {
        let entry: PluginEntry = "odd#name#beta".parse().unwrap();
        assert_eq!(entry.name, "odd#name");
        assert_eq!(entry.channel.as_deref(), Some("beta"));
    }

    #[test]
    fn server_registry_is_not_a_plugin_source() {
        let err = "paper/luckperms".parse::<PluginEntry>().unwrap_err();
        assert!(err.to_string().contains("not a plugin registry"));
        assert!("nowhere/luckperms".parse::<PluginEntry>().is_err());
        assert!("modrinth/".parse::<PluginEntry>().is_err());
        assert!("luckperms#".parse::<PluginEntry>().is_err());
    }

    #[test]
    fn partial_queries_match() {
        let entry: PluginEntry = "modrinth/luckperms#beta".parse().unwrap();
        assert!(entry.matches(&PluginEntry::new("luckperms")));
        assert!(entry.matches(&PluginEntry::new("luckperms").with_source(Source::Modrinth)));
        assert!(!entry.matches(&PluginEntry::new("luckperms").with_source(Source::Hangar)));
        assert!(!entry.matches(&PluginEntry::new("luckperms").with_channel("release")));
    }

    #[test]
    fn duplicate_names_are_rejected_even_across_sources() {
        let mut manifest = Manifest::default();
        manifest.plugins.push("luckperms".parse().unwrap());
        manifest.plugins.push("hangar/luckperms".parse().unwrap());
        assert!(matches!(
            manifest.validate(),
            Err(McpmError::DuplicatePlugin(name)) if name == "luckperms"
        ));
    }

    #[test]
    fn game_version_sentinel() {
        assert_eq!("latest".parse::<GameVersion>().unwrap(), GameVersion::Latest);
        assert_eq!(
            "1.21.4".parse::<GameVersion>().unwrap(),
            GameVersion::Exact("1.21.4".into())
        );
        assert!("".parse::<GameVersion>().is_err());
    }
}
