// ─── Reconciliation ───
// Brings a lock into agreement with the manifest. Every operation takes the
// current lock by reference and hands back the next one, so a failure halfway
// through leaves nothing for the caller to persist.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::core::error::{McpmError, McpmResult};
use crate::core::lock::LockState;
use crate::core::manifest::{GameVersion, Manifest, PluginEntry};
use crate::core::resolve::Resolve;

pub struct Reconciler<'r, R: Resolve + ?Sized> {
    resolver: &'r R,
}

impl<'r, R: Resolve + ?Sized> Reconciler<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self { resolver }
    }

    /// Empty lock for the manifest's loader, with `latest` pinned to a concrete
    /// game version.
    pub fn new_lock(&self, manifest: &Manifest) -> McpmResult<LockState> {
        let game_version = match &manifest.version {
            GameVersion::Exact(v) => v.clone(),
            GameVersion::Latest => self.resolver.latest_game_version(manifest.loader)?,
        };
        info!("Starting a new lock for {} {}", manifest.loader, game_version);
        Ok(LockState::new(manifest.loader, game_version))
    }

    /// Resolve what the manifest adds, drop what it no longer declares.
    ///
    /// Records already locked are kept as they are; only new names hit the
    /// network.
    pub fn reconcile(&self, manifest: &Manifest, lock: &LockState) -> McpmResult<LockState> {
        check_compatible(manifest, lock)?;
        manifest.validate()?;

        let mut next = lock.clone();

        if next.server.is_none() {
            next.server = Some(self.resolver.resolve_server(next.loader, &next.game_version)?);
        }

        for entry in &manifest.plugins {
            if next.find_plugin(&entry.name).is_some() {
                continue;
            }
            let record = self.resolver.resolve_plugin(entry, next.loader, &next.game_version)?;
            next.put_plugin(record);
        }

        let declared: HashSet<&str> = manifest.plugins.iter().map(|p| p.name.as_str()).collect();
        next.retain_plugins(|name| {
            let keep = declared.contains(name);
            if !keep {
                info!("Removing {} from the lock", name);
            }
            keep
        });

        Ok(next)
    }

    /// Fresh server build for the locked loader and game version.
    pub fn upgrade_server(&self, lock: &LockState) -> McpmResult<LockState> {
        let mut next = lock.clone();
        next.server = Some(self.resolver.resolve_server(lock.loader, &lock.game_version)?);
        Ok(next)
    }

    /// Re-resolve one locked plugin with the source and channel it was locked
    /// with.
    pub fn upgrade_plugin(&self, lock: &LockState, name: &str) -> McpmResult<LockState> {
        let mut next = lock.clone();
        self.upgrade_plugin_in(&mut next, name)?;
        Ok(next)
    }

    /// Upgrade `names` in order, or every locked plugin when `names` is empty.
    /// Stops at the first failure.
    pub fn upgrade_plugins(&self, lock: &LockState, names: &[String]) -> McpmResult<LockState> {
        let names = if names.is_empty() {
            lock.plugin_names()
        } else {
            names.to_vec()
        };

        let mut next = lock.clone();
        for name in &names {
            self.upgrade_plugin_in(&mut next, name)?;
        }
        Ok(next)
    }

    /// Throw the old lock away: new game version, new server, new plugins.
    pub fn full_upgrade(&self, manifest: &Manifest) -> McpmResult<LockState> {
        let fresh = self.new_lock(manifest)?;
        self.reconcile(manifest, &fresh)
    }

    fn upgrade_plugin_in(&self, lock: &mut LockState, name: &str) -> McpmResult<()> {
        let current = lock
            .find_plugin(name)
            .ok_or_else(|| McpmError::PluginNotLocked(name.to_string()))?;
        let entry = PluginEntry::new(&current.name)
            .with_source(current.source)
            .with_channel(&current.channel);
        debug!("Upgrading {} from {}", name, current.version);

        let record = self.resolver.resolve_plugin(&entry, lock.loader, &lock.game_version)?;
        lock.put_plugin(record);
        Ok(())
    }
}

fn check_compatible(manifest: &Manifest, lock: &LockState) -> McpmResult<()> {
    if manifest.loader != lock.loader {
        return Err(McpmError::LoaderMismatch {
            locked: lock.loader.to_string(),
            declared: manifest.loader.to_string(),
        });
    }
    if let GameVersion::Exact(declared) = &manifest.version {
        if *declared != lock.game_version {
            return Err(McpmError::VersionMismatch {
                locked: lock.game_version.clone(),
                declared: declared.clone(),
            });
        }
    }
    Ok(())
}
