use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::core::artifact::ChecksumPolicy;
use crate::core::error::{ErrorCategory, McpmError, McpmResult};
use crate::core::http::build_http_client;
use crate::core::lock::LockState;
use crate::core::provision::{HttpFetcher, Provisioner};
use crate::core::reconcile::Reconciler;
use crate::core::resolve::Resolver;
use crate::core::state::Project;

#[derive(Parser)]
#[command(name = "mcpm")]
#[command(about = "Minecraft server and plugin manager", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate mcpm.toml in the current directory
    Init,
    /// Generate or update mcpm.lock
    Lock,
    /// Add plugins
    Add {
        /// Plugins as `[source/]name[#channel]`
        #[arg(required = true)]
        plugins: Vec<String>,
    },
    /// Remove plugins
    Remove {
        #[arg(required = true)]
        plugins: Vec<String>,
    },
    /// Upgrade the server and/or plugins
    Upgrade {
        #[command(subcommand)]
        command: Option<UpgradeCommand>,
    },
    /// Provision a Minecraft server in the project directory
    Provision {
        /// Also enforce checksum algorithms that are skipped by default
        #[arg(long)]
        strict_checksums: bool,
    },
}

#[derive(Subcommand, Clone, Default)]
pub enum UpgradeCommand {
    /// Upgrade the server jar (without changing game version)
    Server,
    /// Upgrade the plugin jars; all of them when none are named
    Plugins { plugins: Vec<String> },
    /// Upgrade the server and plugin jars (without changing game version)
    #[default]
    All,
    /// Upgrade everything, including the game version
    Full,
}

/// Process exit status for a failed command.
pub fn exit_code(err: &McpmError) -> u8 {
    match err.category() {
        ErrorCategory::Operation => 1,
        ErrorCategory::Registry => 2,
    }
}

pub fn execute(cli: Cli) -> McpmResult<()> {
    let cwd = std::env::current_dir().map_err(|e| McpmError::io(".", e))?;

    match cli.command {
        Commands::Init => init(&cwd),
        Commands::Lock => lock(&cwd),
        Commands::Add { plugins } => add(&cwd, &plugins),
        Commands::Remove { plugins } => remove(&cwd, &plugins),
        Commands::Upgrade { command } => upgrade(&cwd, command.unwrap_or_default()),
        Commands::Provision { strict_checksums } => provision(&cwd, strict_checksums),
    }
}

fn init(cwd: &Path) -> McpmResult<()> {
    let path = Project::init(cwd)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Reconcile the project's lock with its manifest and persist the result.
fn update_lock(project: &Project, resolver: &Resolver) -> McpmResult<LockState> {
    let reconciler = Reconciler::new(resolver);
    let manifest = project.manifest()?;
    let current = project.current_lock(&reconciler, &manifest)?;

    let next = reconciler.reconcile(&manifest, &current)?;
    project.write_lock(&next)?;
    Ok(next)
}

fn lock(cwd: &Path) -> McpmResult<()> {
    let project = Project::discover(cwd)?;
    let resolver = Resolver::new(build_http_client()?);
    update_lock(&project, &resolver)?;
    Ok(())
}

fn add(cwd: &Path, plugins: &[String]) -> McpmResult<()> {
    let mut project = Project::discover(cwd)?;
    for plugin in plugins {
        let entry = project.manifest_file_mut().add_plugin(plugin)?;
        info!("Adding {}", entry);
    }

    // The manifest is only saved once the lock agrees with it.
    let resolver = Resolver::new(build_http_client()?);
    update_lock(&project, &resolver)?;
    project.save_manifest()
}

fn remove(cwd: &Path, plugins: &[String]) -> McpmResult<()> {
    let mut project = Project::discover(cwd)?;
    for plugin in plugins {
        let entry = project.manifest_file_mut().remove_plugin(plugin)?;
        info!("Removing {}", entry);
    }

    let resolver = Resolver::new(build_http_client()?);
    update_lock(&project, &resolver)?;
    project.save_manifest()
}

fn upgrade(cwd: &Path, command: UpgradeCommand) -> McpmResult<()> {
    let project = Project::discover(cwd)?;
    let resolver = Resolver::new(build_http_client()?);
    let reconciler = Reconciler::new(&resolver);
    let manifest = project.manifest()?;

    let next = match command {
        UpgradeCommand::Full => reconciler.full_upgrade(&manifest)?,
        UpgradeCommand::Server => {
            let current = project.current_lock(&reconciler, &manifest)?;
            reconciler.upgrade_server(&current)?
        }
        UpgradeCommand::Plugins { plugins } => {
            let current = project.current_lock(&reconciler, &manifest)?;
            reconciler.upgrade_plugins(&current, &plugins)?
        }
        UpgradeCommand::All => {
            let current = project.current_lock(&reconciler, &manifest)?;
            let next = reconciler.upgrade_server(&current)?;
            reconciler.upgrade_plugins(&next, &[])?
        }
    };

    project.write_lock(&next)
}

fn provision(cwd: &Path, strict_checksums: bool) -> McpmResult<()> {
    let project = Project::discover(cwd)?;
    let client = build_http_client()?;
    let lock = update_lock(&project, &Resolver::new(client.clone()))?;

    let policy = if strict_checksums {
        ChecksumPolicy::strict()
    } else {
        ChecksumPolicy::default()
    };
    let report = Provisioner::new(HttpFetcher::new(client), policy).provision(&lock, project.root())?;
    println!(
        "Provisioned {} files ({} downloaded) in {}",
        report.verified,
        report.downloaded,
        project.root().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backends::Source;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upgrade_defaults_to_all() {
        let cli = Cli::try_parse_from(["mcpm", "upgrade"]).unwrap();
        match cli.command {
            Commands::Upgrade { command } => {
                assert!(matches!(command.unwrap_or_default(), UpgradeCommand::All))
            }
            _ => panic!("expected upgrade"),
        }
    }

    #[test]
    fn upgrade_plugins_takes_optional_names() {
        let cli = Cli::try_parse_from(["mcpm", "upgrade", "plugins", "a", "b"]).unwrap();
        match cli.command {
            Commands::Upgrade {
                command: Some(UpgradeCommand::Plugins { plugins }),
            } => assert_eq!(plugins, vec!["a", "b"]),
            _ => panic!("expected upgrade plugins"),
        }

        let cli = Cli::try_parse_from(["mcpm", "upgrade", "plugins"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Upgrade { command: Some(UpgradeCommand::Plugins { plugins }) } if plugins.is_empty()
        ));
    }

    #[test]
    fn add_requires_at_least_one_plugin() {
        assert!(Cli::try_parse_from(["mcpm", "add"]).is_err());
        let cli = Cli::try_parse_from(["mcpm", "add", "hangar/ViaVersion#Snapshot"]).unwrap();
        assert!(matches!(cli.command, Commands::Add { plugins } if plugins.len() == 1));
    }

    #[test]
    fn provision_strict_flag() {
        let cli = Cli::try_parse_from(["mcpm", "provision", "--strict-checksums"]).unwrap();
        assert!(matches!(cli.command, Commands::Provision { strict_checksums: true }));
    }

    #[test]
    fn exit_codes_follow_the_error_category() {
        assert_eq!(exit_code(&McpmError::registry(Source::Hangar, "boom")), 2);
        let download = McpmError::DownloadFailed {
            url: "https://hangarcdn.papermc.io/a.jar".into(),
            status: 503,
        };
        assert_eq!(exit_code(&download), 2);
        assert_eq!(exit_code(&McpmError::MissingServer), 1);
        assert_eq!(exit_code(&McpmError::NotAvailable("x".into())), 1);
    }
}
