pub mod backend;
pub mod fill;
pub mod geyser;
pub mod hangar;
pub mod modrinth;
pub mod ordering;
pub mod source;

pub use backend::{Backend, PluginBackend, ServerBackend, VersionIter};
pub use fill::FillBackend;
pub use source::{ServerKind, Source, DEFAULT_PLUGIN_SOURCE};
