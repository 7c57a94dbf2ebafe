// ─── mcpm core ───
// Manifest in, lock out, files on disk.
//
// Architecture:
//   core/
//     artifact/   — Download artifacts, version records, checksum policy
//     backends/   — Modrinth, Hangar, Geyser (plugins) and Fill (servers)
//     manifest/   — mcpm.toml model + comment-preserving editor
//     lock/       — mcpm.lock model + atomic persistence
//     resolve/    — Name + constraints → one concrete version
//     reconcile/  — Manifest/lock reconciliation and upgrades
//     provision/  — Download + checksum verification
//     state/      — Project discovery and file wiring

pub mod artifact;
pub mod backends;
pub mod error;
pub mod files;
pub mod http;
pub mod lock;
pub mod manifest;
pub mod provision;
pub mod reconcile;
pub mod resolve;
pub mod state;
