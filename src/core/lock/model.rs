use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::artifact::VersionRecord;
use crate::core::backends::ServerKind;
use crate::core::error::{McpmError, McpmResult};

/// Exactly what is installed: persisted as `mcpm.lock`.
///
/// `loader` and `game_version` are fixed for the life of a lock; changing
/// either means building a new one (`mcpm upgrade full` or deleting the
/// file). Plugins are unique by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub loader: ServerKind,
    pub game_version: String,
    /// `None` only until the first successful reconcile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<VersionRecord>,
    #[serde(default)]
    pub plugins: Vec<VersionRecord>,
}

impl LockState {
    pub fn new(loader: ServerKind, game_version: impl Into<String>) -> Self {
        Self {
            loader,
            game_version: game_version.into(),
            server: None,
            plugins: Vec::new(),
        }
    }

    pub fn find_plugin(&self, name: &str) -> Option<&VersionRecord> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name.clone()).collect()
    }

    /// Insert `record`, replacing (in place) any plugin with the same name.
    pub fn put_plugin(&mut self, record: VersionRecord) {
        match self.plugins.iter_mut().find(|p| p.name == record.name) {
            Some(existing) => *existing = record,
            None => self.plugins.push(record),
        }
    }

    /// Drop every plugin whose name `keep` rejects.
    pub fn retain_plugins(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.plugins.retain(|p| keep(&p.name));
    }

    pub fn validate(&self) -> McpmResult<()> {
        if self.game_version.is_empty() {
            return Err(McpmError::Lock("game_version is empty".into()));
        }

        let mut seen = HashSet::new();
        for record in self.server.iter().chain(&self.plugins) {
            if record.downloads.is_empty() {
                return Err(McpmError::Lock(format!("{} has no downloads", record.name)));
            }
        }
        for plugin in &self.plugins {
            if !seen.insert(plugin.name.as_str()) {
                return Err(McpmError::Lock(format!(
                    "plugin {} is locked more than once",
                    plugin.name
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON with a trailing newline; identical states give identical
    /// bytes.
    pub fn to_json(&self) -> McpmResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> McpmResult<Self> {
        let lock: LockState = serde_json::from_str(json)?;
        lock.validate()?;
        Ok(lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::{Checksums, DownloadArtifact};
    use crate::core::backends::Source;

    fn record(name: &str, source: Source, version: &str) -> VersionRecord {
        let mut checksums = Checksums::new();
        checksums.insert("sha256".into(), format!("{}-digest", name));
        VersionRecord::new(
            name,
            source,
            version,
            "release",
            vec![
                DownloadArtifact::new(format!("https://x/{}.jar", name), format!("{}.jar", name), checksums),
                DownloadArtifact::new(format!("https://x/{}-extra.jar", name), format!("{}-extra.jar", name), Checksums::new()),
            ],
        )
    }

    fn sample() -> LockState {
        let mut lock = LockState::new(ServerKind::Paper, "1.21.4");
        lock.server = Some(record("paper", Source::Paper, "1.21.4-232"));
        lock.put_plugin(record("luckperms", Source::Modrinth, "5.4.145"));
        lock.put_plugin(record("ViaVersion", Source::Hangar, "5.2.1"));
        lock
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let lock = sample();
        let decoded = LockState::from_json(&lock.to_json().unwrap()).unwrap();
        assert_eq!(decoded, lock);
        // Artifact order inside a record survives.
        assert_eq!(decoded.plugins[0].downloads[1].filename, "luckperms-extra.jar");
    }

    #[test]
    fn payload_uses_the_documented_field_names() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["loader"], "paper");
        assert_eq!(value["game_version"], "1.21.4");
        assert_eq!(value["server"]["source"], "paper");
        assert_eq!(value["plugins"][1]["source"], "hangar");
        assert_eq!(value["plugins"][0]["downloads"][0]["url"], "https://x/luckperms.jar");
        assert_eq!(
            value["plugins"][0]["downloads"][0]["checksums"]["sha256"],
            "luckperms-digest"
        );
    }

    #[test]
    fn serialization_is_stable() {
        assert_eq!(sample().to_json().unwrap(), sample().to_json().unwrap());
    }

    #[test]
    fn put_plugin_replaces_in_place() {
        let mut lock = sample();
        lock.put_plugin(record("luckperms", Source::Modrinth, "5.4.150"));
        assert_eq!(lock.plugins.len(), 2);
        assert_eq!(lock.plugins[0].version, "5.4.150");
    }

    #[test]
    fn duplicate_plugins_are_rejected_on_load() {
        let mut lock = sample();
        lock.plugins.push(record("luckperms", Source::Hangar, "1"));
        let json = serde_json::to_string(&lock).unwrap();
        assert!(matches!(LockState::from_json(&json), Err(McpmError::Lock(_))));
    }

    #[test]
    fn lock_without_server_or_plugins_decodes() {
        let lock = LockState::from_json(r#"{"loader": "folia", "game_version": "1.21.4"}"#).unwrap();
        assert_eq!(lock.loader, ServerKind::Folia);
        assert!(lock.server.is_none());
        assert!(lock.plugins.is_empty());
    }
}
