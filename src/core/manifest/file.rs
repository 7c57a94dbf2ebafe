// ─── mcpm.toml ───
// Reads and edits the manifest with toml_edit so comments and layout the
// user wrote survive `mcpm add` / `mcpm remove`.

use std::path::{Path, PathBuf};

use toml_edit::{Array, DocumentMut, Item};
use tracing::debug;

use super::model::{GameVersion, Manifest, PluginEntry, DEFAULT_LOADER, DEFAULT_VERSION};
use crate::core::error::{McpmError, McpmResult};
use crate::core::files::write_atomic;

pub const MANIFEST_FILE: &str = "mcpm.toml";

/// Closest directory at or above `start` holding an `mcpm.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

pub struct ManifestFile {
    path: PathBuf,
    doc: DocumentMut,
}

impl ManifestFile {
    /// Fresh, commented manifest for `mcpm init`. Nothing is written yet.
    pub fn template(root_dir: &Path) -> McpmResult<Self> {
        let text = format!(
            "# generated with 'mcpm init'. feel free to modify.\n\
             [server]\n\
             loader = \"{}\" # paper, folia, velocity, waterfall or travertine.\n\
             version = \"{}\" # can be a minecraft number, or the word 'latest'.\n\
             \n\
             # add new plugins with 'mcpm add' or by modifying the list below.\n\
             plugins = []\n",
            DEFAULT_LOADER, DEFAULT_VERSION
        );
        Ok(Self {
            path: root_dir.join(MANIFEST_FILE),
            doc: text.parse()?,
        })
    }

    pub fn load(path: &Path) -> McpmResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| McpmError::io(path, e))?;
        let file = Self {
            path: path.to_path_buf(),
            doc: text.parse()?,
        };
        // Surface a broken manifest on load rather than on first use.
        file.manifest()?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> McpmResult<()> {
        write_atomic(&self.path, self.doc.to_string().as_bytes())?;
        debug!("Wrote {:?}", self.path);
        Ok(())
    }

    /// Decode the document, filling in defaults for missing keys.
    pub fn manifest(&self) -> McpmResult<Manifest> {
        let server = self.doc.get("server");

        let loader = match server.and_then(|s| s.get("loader")) {
            None => DEFAULT_LOADER,
            Some(item) => item
                .as_str()
                .ok_or_else(|| McpmError::Manifest("server.loader must be a string".into()))?
                .parse()?,
        };
        let version = match server.and_then(|s| s.get("version")) {
            None => GameVersion::Latest,
            Some(item) => item
                .as_str()
                .ok_or_else(|| McpmError::Manifest("server.version must be a string".into()))?
                .parse()?,
        };

        let mut manifest = Manifest::new(loader, version);
        if let Some(item) = server.and_then(|s| s.get("plugins")) {
            for entry in plugin_strings(item)? {
                manifest.plugins.push(entry.parse()?);
            }
        }
        manifest.validate()?;
        Ok(manifest)
    }

    /// Append an entry; its logical name must not be declared yet.
    pub fn add_plugin(&mut self, full_name: &str) -> McpmResult<PluginEntry> {
        let entry: PluginEntry = full_name.parse()?;
        if self.manifest()?.declares(&entry.name) {
            return Err(McpmError::DuplicatePlugin(entry.name));
        }
        self.plugins_mut()?.push(entry.to_string());
        Ok(entry)
    }

    /// Remove the entry matching `query` (name, plus source/channel if given).
    pub fn remove_plugin(&mut self, query: &str) -> McpmResult<PluginEntry> {
        let query: PluginEntry = query.parse()?;
        let plugins = self.plugins_mut()?;

        let mut found = None;
        for (idx, value) in plugins.iter().enumerate() {
            let entry: PluginEntry = value.as_str().unwrap_or_default().parse()?;
            if entry.matches(&query) {
                found = Some((idx, entry));
                break;
            }
        }

        let (idx, entry) = found.ok_or_else(|| {
            McpmError::Manifest(format!("plugin {} is not declared in {}", query, MANIFEST_FILE))
        })?;
        plugins.remove(idx);
        Ok(entry)
    }

    fn plugins_mut(&mut self) -> McpmResult<&mut Array> {
        let server = self
            .doc
            .entry("server")
            .or_insert(toml_edit::table())
            .as_table_like_mut()
            .ok_or_else(|| McpmError::Manifest("[server] must be a table".into()))?;
        server
            .entry("plugins")
            .or_insert(toml_edit::value(Array::new()))
            .as_array_mut()
            .ok_or_else(|| McpmError::Manifest("server.plugins must be a list of strings".into()))
    }
}

fn plugin_strings(item: &Item) -> McpmResult<Vec<&str>> {
    let array = item
        .as_array()
        .ok_or_else(|| McpmError::Manifest("server.plugins must be a list of strings".into()))?;
    array
        .iter()
        .map(|value| {
            value.as_str().ok_or_else(|| {
                McpmError::Manifest("server.plugins must be a list of strings".into())
            })
        })
        .collect()
}
