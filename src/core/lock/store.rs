use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::model::LockState;
use crate::core::error::{McpmError, McpmResult};
use crate::core::files::write_atomic;

pub const LOCK_FILE: &str = "mcpm.lock";

/// Reads and writes `mcpm.lock` in a project directory.
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(root_dir: &Path) -> Self {
        Self {
            path: root_dir.join(LOCK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the project has never been locked.
    pub fn load(&self) -> McpmResult<Option<LockState>> {
        if !self.path.is_file() {
            debug!("No lock file at {:?}", self.path);
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| McpmError::io(&self.path, e))?;
        LockState::from_json(&json).map(Some)
    }

    /// Replace the lock file in one step; a crash mid-write leaves the old
    /// file intact.
    pub fn save(&self, lock: &LockState) -> McpmResult<()> {
        lock.validate()?;
        let json = lock.to_json()?;

        let unchanged = std::fs::read_to_string(&self.path)
            .map(|current| current == json)
            .unwrap_or(false);
        if unchanged {
            debug!("{:?} is already up to date", self.path);
            return Ok(());
        }

        write_atomic(&self.path, json.as_bytes())?;
        info!(
            "Locked {} {} with {} plugins",
            lock.loader,
            lock.game_version,
            lock.plugins.len()
        );
        Ok(())
    }
}
