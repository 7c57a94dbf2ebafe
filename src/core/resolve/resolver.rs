use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::core::artifact::VersionRecord;
use crate::core::backends::{
    Backend, FillBackend, ServerBackend, ServerKind, VersionIter, DEFAULT_PLUGIN_SOURCE,
};
use crate::core::error::{McpmError, McpmResult};
use crate::core::manifest::PluginEntry;

/// Turns a name plus constraints into one concrete `VersionRecord`.
///
/// Every call goes to the network; nothing is cached between calls.
pub trait Resolve {
    /// Newest candidate for `entry`, honouring its explicit source/channel
    /// and falling back to the default registry and its default channel.
    fn resolve_plugin(
        &self,
        entry: &PluginEntry,
        loader: ServerKind,
        game_version: &str,
    ) -> McpmResult<VersionRecord>;

    fn resolve_server(&self, loader: ServerKind, game_version: &str) -> McpmResult<VersionRecord>;

    fn latest_game_version(&self, loader: ServerKind) -> McpmResult<String>;
}

/// `Resolve` backed by the live registries.
pub struct Resolver {
    client: Client,
    servers: FillBackend,
}

impl Resolver {
    pub fn new(client: Client) -> Self {
        Self {
            servers: FillBackend::new(client.clone()),
            client,
        }
    }
}

/// First item of a candidate sequence, or `None` when it is empty.
fn first(mut versions: VersionIter) -> McpmResult<Option<VersionRecord>> {
    versions.next().transpose()
}

/// Registry and channel an entry is looked up in: its own, or the default
/// registry and that registry's default channel.
fn plugin_query(entry: &PluginEntry, client: &Client) -> McpmResult<(Backend, String)> {
    let source = entry.source.unwrap_or(DEFAULT_PLUGIN_SOURCE);
    let backend = Backend::new(source, client.clone())?;
    let channel = match &entry.channel {
        Some(channel) => channel.clone(),
        None => backend.default_channel().to_string(),
    };
    Ok((backend, channel))
}

fn pick_plugin(
    versions: VersionIter,
    name: &str,
    loader: ServerKind,
    game_version: &str,
) -> McpmResult<VersionRecord> {
    first(versions)?.ok_or_else(|| {
        McpmError::NotAvailable(format!(
            "Plugin {} is not available for Minecraft {} on {}.",
            name, game_version, loader
        ))
    })
}

fn pick_server(versions: VersionIter, loader: ServerKind, game_version: &str) -> McpmResult<VersionRecord> {
    first(versions)?.ok_or_else(|| {
        McpmError::NotAvailable(format!(
            "Server {} is not available for Minecraft {}.",
            loader, game_version
        ))
    })
}

impl Resolve for Resolver {
    fn resolve_plugin(
        &self,
        entry: &PluginEntry,
        loader: ServerKind,
        game_version: &str,
    ) -> McpmResult<VersionRecord> {
        let (backend, channel) = plugin_query(entry, &self.client)?;
        debug!(
            "Resolving {} (channel {}) for {} {}",
            entry.name, channel, loader, game_version
        );

        let versions = backend.iter_plugin_versions(&entry.name, loader, game_version, &channel)?;
        let record = pick_plugin(versions, &entry.name, loader, game_version)?;
        info!("Resolved {} {} ({})", record.name, record.version, record.source);
        Ok(record)
    }

    fn resolve_server(&self, loader: ServerKind, game_version: &str) -> McpmResult<VersionRecord> {
        debug!("Resolving server {} for Minecraft {}", loader, game_version);
        let versions = self.servers.iter_server_versions(loader, game_version)?;

        let record = pick_server(versions, loader, game_version)?;
        info!("Resolved server {} {}", record.name, record.version);
        Ok(record)
    }

    fn latest_game_version(&self, loader: ServerKind) -> McpmResult<String> {
        self.servers.latest_game_version(loader)
    }
}
