// ─── Provisioning ───
// Materialises a lock on disk: server jar in the install directory, plugin
// jars under `plugins/`. Missing files are downloaded; every file, old or new,
// is checked against its published digests on every run.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use super::fetcher::ArtifactFetcher;
use crate::core::artifact::{ChecksumPolicy, DownloadArtifact, VersionRecord};
use crate::core::error::{McpmError, McpmResult};
use crate::core::files::create_dir_safe;
use crate::core::lock::LockState;

pub const PLUGINS_DIR: &str = "plugins";

/// What a provisioning run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Artifacts fetched because they were not on disk yet.
    pub downloaded: usize,
    /// Artifacts checked against their checksums (all of them).
    pub verified: usize,
    /// Individual digests compared across all artifacts.
    pub digests: usize,
}

pub struct Provisioner<F: ArtifactFetcher> {
    fetcher: F,
    policy: ChecksumPolicy,
}

impl<F: ArtifactFetcher> Provisioner<F> {
    pub fn new(fetcher: F, policy: ChecksumPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Install the server, then each plugin, stopping at the first failure.
    pub fn provision(&self, lock: &LockState, install_dir: &Path) -> McpmResult<ProvisionReport> {
        let server = lock.server.as_ref().ok_or(McpmError::MissingServer)?;
        let mut report = ProvisionReport::default();

        create_dir_safe(install_dir)?;
        self.install(server, install_dir, &mut report)?;

        let plugins_dir = install_dir.join(PLUGINS_DIR);
        create_dir_safe(&plugins_dir)?;
        for plugin in &lock.plugins {
            self.install(plugin, &plugins_dir, &mut report)?;
        }

        info!(
            "Provisioned {} artifacts ({} downloaded)",
            report.verified, report.downloaded
        );
        Ok(report)
    }

    fn install(&self, record: &VersionRecord, dir: &Path, report: &mut ProvisionReport) -> McpmResult<()> {
        debug!("Installing {} {}", record.name, record.version);
        for artifact in &record.downloads {
            self.install_artifact(artifact, dir, report)?;
        }
        Ok(())
    }

    fn install_artifact(
        &self,
        artifact: &DownloadArtifact,
        dir: &Path,
        report: &mut ProvisionReport,
    ) -> McpmResult<()> {
        let dest = destination(dir, &artifact.filename)?;

        if dest.exists() {
            debug!("{:?} already present", dest);
        } else {
            info!("Downloading {}", artifact);
            self.fetcher.fetch(&artifact.url, &dest)?;
            report.downloaded += 1;
        }

        // A mismatching file is left where it is for inspection.
        report.digests += self.policy.verify_file(&dest, &artifact.checksums)?;
        report.verified += 1;
        Ok(())
    }
}

/// `dir/filename`, refusing names that would escape `dir`.
fn destination(dir: &Path, filename: &str) -> McpmResult<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if !filename.contains(['/', '\\']) => {
            Ok(dir.join(name))
        }
        _ => Err(McpmError::InvalidFilename(filename.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::core::artifact::Checksums;
    use crate::core::backends::{ServerKind, Source};

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    /// Serves bodies from memory and remembers what was asked for.
    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        fetched: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn serving(bodies: &[(&str, &[u8])]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_vec()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl ArtifactFetcher for &FakeFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> McpmResult<()> {
            self.fetched.borrow_mut().push(url.to_string());
            let body = self.bodies.get(url).ok_or_else(|| McpmError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            })?;
            std::fs::write(dest, body).map_err(|e| McpmError::io(dest, e))
        }
    }

    fn checksums(pairs: &[(&str, &str)]) -> Checksums {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lock_with(plugin_checksums: Checksums) -> LockState {
        let mut lock = LockState::new(ServerKind::Paper, "1.21.4");
        lock.server = Some(VersionRecord::new(
            "paper",
            Source::Paper,
            "1.21.4-232",
            "STABLE",
            vec![DownloadArtifact::new(
                "https://fill/paper.jar",
                "paper-1.21.4-232.jar",
                checksums(&[("sha256", HELLO_SHA256)]),
            )],
        ));
        lock.plugins.push(VersionRecord::new(
            "luckperms",
            Source::Modrinth,
            "5.4.145",
            "release",
            vec![DownloadArtifact::new(
                "https://modrinth/luckperms.jar",
                "LuckPerms.jar",
                plugin_checksums,
            )],
        ));
        lock
    }

    fn hello_fetcher() -> FakeFetcher {
        FakeFetcher::serving(&[
            ("https://fill/paper.jar", &b"hello"[..]),
            ("https://modrinth/luckperms.jar", &b"hello"[..]),
        ])
    }

    #[test]
    fn server_and_plugins_land_in_their_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = hello_fetcher();
        let lock = lock_with(checksums(&[("sha1", HELLO_SHA1)]));

        let report = Provisioner::new(&fetcher, ChecksumPolicy::default())
            .provision(&lock, dir.path())
            .unwrap();

        assert!(dir.path().join("paper-1.21.4-232.jar").is_file());
        assert!(dir.path().join(PLUGINS_DIR).join("LuckPerms.jar").is_file());
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.verified, 2);
        assert_eq!(report.digests, 2);
    }

    #[test]
    fn second_run_downloads_nothing_but_still_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = hello_fetcher();
        let lock = lock_with(checksums(&[("sha1", HELLO_SHA1)]));
        let provisioner = Provisioner::new(&fetcher, ChecksumPolicy::default());

        provisioner.provision(&lock, dir.path()).unwrap();
        let second = provisioner.provision(&lock, dir.path()).unwrap();

        assert_eq!(second.downloaded, 0);
        assert_eq!(second.verified, 2);
        assert_eq!(second.digests, 2);
        assert_eq!(fetcher.fetched.borrow().len(), 2);
    }

    #[test]
    fn local_corruption_is_caught_on_a_later_run() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = hello_fetcher();
        let lock = lock_with(checksums(&[("sha1", HELLO_SHA1)]));
        let provisioner = Provisioner::new(&fetcher, ChecksumPolicy::default());

        provisioner.provision(&lock, dir.path()).unwrap();
        std::fs::write(dir.path().join("paper-1.21.4-232.jar"), b"tampered").unwrap();

        assert!(matches!(
            provisioner.provision(&lock, dir.path()),
            Err(McpmError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn checksum_mismatch_stops_and_leaves_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = hello_fetcher();
        let lock = lock_with(checksums(&[("sha1", "0000")]));

        let err = Provisioner::new(&fetcher, ChecksumPolicy::default())
            .provision(&lock, dir.path())
            .unwrap_err();

        assert!(matches!(err, McpmError::ChecksumMismatch { .. }));
        assert!(dir.path().join(PLUGINS_DIR).join("LuckPerms.jar").is_file());
    }

    #[test]
    fn unreliable_digests_are_skipped_unless_strict() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = hello_fetcher();
        let lock = lock_with(checksums(&[("sha512", "not-a-real-digest")]));

        let report = Provisioner::new(&fetcher, ChecksumPolicy::default())
            .provision(&lock, dir.path())
            .unwrap();
        assert_eq!(report.digests, 1);

        assert!(matches!(
            Provisioner::new(&fetcher, ChecksumPolicy::strict()).provision(&lock, dir.path()),
            Err(McpmError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn lock_without_server_cannot_be_provisioned() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default();
        let lock = LockState::new(ServerKind::Paper, "1.21.4");
        assert!(matches!(
            Provisioner::new(&fetcher, ChecksumPolicy::default()).provision(&lock, dir.path()),
            Err(McpmError::MissingServer)
        ));
    }

    #[test]
    fn failed_download_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::serving(&[("https://fill/paper.jar", &b"hello"[..])]);
        let lock = lock_with(Checksums::new());

        assert!(matches!(
            Provisioner::new(&fetcher, ChecksumPolicy::default()).provision(&lock, dir.path()),
            Err(McpmError::DownloadFailed { status: 404, .. })
        ));
    }

    #[test]
    fn filenames_cannot_escape_the_target_directory() {
        let dir = Path::new("/srv/mc");
        assert_eq!(destination(dir, "a.jar").unwrap(), dir.join("a.jar"));
        for bad in ["", ".", "..", "../a.jar", "sub/a.jar", "sub\\a.jar", "/etc/passwd"] {
            assert!(
                matches!(destination(dir, bad), Err(McpmError::InvalidFilename(_))),
                "{bad} should be rejected"
            );
        }
    }
}
