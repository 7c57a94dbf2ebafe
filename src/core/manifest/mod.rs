pub mod file;
pub mod model;

pub use file::{find_project_root, ManifestFile, MANIFEST_FILE};
pub use model::{GameVersion, Manifest, PluginEntry, DEFAULT_LOADER, DEFAULT_VERSION};
