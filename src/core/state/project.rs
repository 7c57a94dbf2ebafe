use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{McpmError, McpmResult};
use crate::core::lock::{LockState, LockStore};
use crate::core::manifest::{find_project_root, Manifest, ManifestFile, MANIFEST_FILE};
use crate::core::reconcile::Reconciler;
use crate::core::resolve::Resolve;

/// A server directory: its manifest, its lock and where it installs to.
pub struct Project {
    root: PathBuf,
    manifest: ManifestFile,
    locks: LockStore,
}

impl Project {
    /// Write a template `mcpm.toml` into `dir`. Fails if one already exists.
    pub fn init(dir: &Path) -> McpmResult<PathBuf> {
        if dir.join(MANIFEST_FILE).is_file() {
            return Err(McpmError::Other(format!(
                "The {} file already exists in directory {}.",
                MANIFEST_FILE,
                dir.display()
            )));
        }

        let file = ManifestFile::template(dir)?;
        file.save()?;
        info!("Created {:?}", file.path());
        Ok(file.path().to_path_buf())
    }

    /// Open the project whose root is `start` or its closest ancestor with a
    /// manifest.
    pub fn discover(start: &Path) -> McpmResult<Self> {
        let root = find_project_root(start).ok_or_else(|| {
            McpmError::Other(format!(
                "No {} found in {} or any parent directory. Run 'mcpm init' first.",
                MANIFEST_FILE,
                start.display()
            ))
        })?;
        Self::open(&root)
    }

    pub fn open(root: &Path) -> McpmResult<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            manifest: ManifestFile::load(&root.join(MANIFEST_FILE))?,
            locks: LockStore::new(root),
        })
    }

    /// Artifacts are installed here.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> McpmResult<Manifest> {
        self.manifest.manifest()
    }

    pub fn manifest_file_mut(&mut self) -> &mut ManifestFile {
        &mut self.manifest
    }

    pub fn save_manifest(&self) -> McpmResult<()> {
        self.manifest.save()
    }

    /// The persisted lock, or a new empty one for the manifest.
    pub fn current_lock<R: Resolve + ?Sized>(
        &self,
        reconciler: &Reconciler<'_, R>,
        manifest: &Manifest,
    ) -> McpmResult<LockState> {
        match self.locks.load()? {
            Some(lock) => Ok(lock),
            None => reconciler.new_lock(manifest),
        }
    }

    pub fn write_lock(&self, lock: &LockState) -> McpmResult<()> {
        self.locks.save(lock)
    }
}
