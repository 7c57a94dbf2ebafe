// ─── Checksums ───
// Streaming digests for downloaded artifacts and the policy deciding which
// published digests are enforced.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};
use tracing::debug;

use super::model::Checksums;
use crate::core::error::{McpmError, McpmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

/// Algorithms whose published digests are not enforced by default.
///
/// sha512 values recorded from Modrinth have failed verification in the
/// past. Skipping them leaves sha1 as the only check for Modrinth files;
/// `ChecksumPolicy::strict` turns them back on.
pub const UNRELIABLE_ALGORITHMS: &[ChecksumAlgorithm] = &[ChecksumAlgorithm::Sha512];

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    /// Hex digest of the file at `path`, read from the start.
    pub fn digest_file(&self, path: &Path) -> McpmResult<String> {
        match self {
            ChecksumAlgorithm::Md5 => digest_with::<Md5>(path),
            ChecksumAlgorithm::Sha1 => digest_with::<Sha1>(path),
            ChecksumAlgorithm::Sha256 => digest_with::<Sha256>(path),
            ChecksumAlgorithm::Sha512 => digest_with::<Sha512>(path),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = McpmError;

    /// Registries disagree on spelling (`sha256`, `SHA-256`, `sha_256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha1" => Ok(ChecksumAlgorithm::Sha1),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" => Ok(ChecksumAlgorithm::Sha512),
            _ => Err(McpmError::UnsupportedChecksum(s.to_string())),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn digest_with<D: Digest + io::Write>(path: &Path) -> McpmResult<String> {
    // A fresh handle per algorithm: every digest starts at byte zero.
    let mut file = File::open(path).map_err(|e| McpmError::io(path, e))?;
    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher).map_err(|e| McpmError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Which published digests are enforced during provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPolicy {
    skipped: Vec<ChecksumAlgorithm>,
}

impl Default for ChecksumPolicy {
    fn default() -> Self {
        Self {
            skipped: UNRELIABLE_ALGORITHMS.to_vec(),
        }
    }
}

impl ChecksumPolicy {
    /// Verify every algorithm, including the ones in `UNRELIABLE_ALGORITHMS`.
    pub fn strict() -> Self {
        Self {
            skipped: Vec::new(),
        }
    }

    pub fn skips(&self, algorithm: ChecksumAlgorithm) -> bool {
        self.skipped.contains(&algorithm)
    }

    /// Check `path` against every enforced entry of `checksums`.
    ///
    /// Comparison is case-insensitive. Returns the number of digests
    /// actually compared.
    pub fn verify_file(&self, path: &Path, checksums: &Checksums) -> McpmResult<usize> {
        let mut verified = 0;
        for (name, expected) in checksums {
            let algorithm: ChecksumAlgorithm = name.parse()?;
            if self.skips(algorithm) {
                debug!("Skipping {} check for {:?}", algorithm, path);
                continue;
            }

            let actual = algorithm.digest_file(path)?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(McpmError::ChecksumMismatch {
                    path: path.to_path_buf(),
                    algorithm: algorithm.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!("{} ok for {:?}", algorithm, path);
            verified += 1;
        }
        Ok(verified)
    }
}
