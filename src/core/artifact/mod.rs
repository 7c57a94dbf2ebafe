pub mod checksum;
pub mod model;

pub use checksum::{ChecksumAlgorithm, ChecksumPolicy, UNRELIABLE_ALGORITHMS};
pub use model::{Checksums, DownloadArtifact, VersionRecord};
