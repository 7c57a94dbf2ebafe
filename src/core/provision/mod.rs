pub mod fetcher;
pub mod installer;

pub use fetcher::{ArtifactFetcher, HttpFetcher};
pub use installer::{ProvisionReport, Provisioner, PLUGINS_DIR};
