//! selective-deploy
//!
//! Decides which services of a monorepo need a new image and points their
//! Helm values at it.
//!
//! # Architecture Overview
//!
//! ```text
//!   git diff --name-only                         deploy.toml
//!          │                                          │
//!          ▼                                          ▼
//!   ┌─────────────┐     ┌──────────────┐      ┌──────────────┐
//!   │  ChangeSet  │────▶│   Detector   │◀─────│    config    │
//!   └─────────────┘     └──────┬───────┘      └──────┬───────┘
//!                              │ DirtySet            │
//!                              ▼                     │
//!                       ┌──────────────┐             │
//!                       │ rollout plan │◀────────────┘
//!                       └──────┬───────┘   --tag <commit>
//!                              ▼
//!                       ┌──────────────┐
//!                       │   executor   │  one task per manifest
//!                       │   + patcher  │
//!                       └──────┬───────┘
//!                              ▼
//!                     values.yaml (atomic write)
//! ```
//!
//! Building and pushing images, and committing the patched manifests,
//! stay with the CI job.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use selective_deploy::config::load_config;
use selective_deploy::detect::changes::{render, ChangeSet, OutputFormat};
use selective_deploy::observability::init_logging;
use selective_deploy::patch::{patch_str, PatchTarget};
use selective_deploy::rollout::{self, plan_rollout};
use selective_deploy::DirtySet;

#[derive(Parser)]
#[command(name = "selective-deploy")]
#[command(about = "Selective image rollout for GitOps monorepos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the units affected by a set of changed paths
    Detect {
        #[arg(short, long, default_value = "deploy.toml")]
        config: PathBuf,

        /// Select every unit regardless of changes (manual trigger)
        #[arg(long)]
        all: bool,

        /// File with one changed path per line ("-" for stdin)
        #[arg(long)]
        changes_file: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Lines)]
        format: OutputFormat,

        /// Changed paths
        paths: Vec<String>,
    },
    /// Replace one field of one section in a YAML document
    Patch {
        /// Document to patch
        file: PathBuf,

        #[arg(long, default_value = "image")]
        section: String,

        #[arg(long, default_value = "repository")]
        field: String,

        /// 0-based occurrence of the section
        #[arg(long, default_value_t = 0)]
        occurrence: usize,

        #[arg(long)]
        value: String,

        /// Write back to the file instead of stdout
        #[arg(short, long)]
        in_place: bool,
    },
    /// Detect dirty units and point their manifests at a new tag
    Rollout {
        #[arg(short, long, default_value = "deploy.toml")]
        config: PathBuf,

        /// Repository root manifests are resolved against
        /// (defaults to the config file's directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Image tag to deploy, e.g. the commit hash
        #[arg(long)]
        tag: String,

        #[arg(long)]
        all: bool,

        #[arg(long)]
        changes_file: Option<PathBuf>,

        /// Print the changes without writing
        #[arg(long)]
        dry_run: bool,

        paths: Vec<String>,
    },
    /// Check a configuration file
    Validate {
        #[arg(short, long, default_value = "deploy.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    let result = run(cli.command).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Detect {
            config,
            all,
            changes_file,
            format,
            paths,
        } => {
            let config = load_config(&config)?;
            let detector = config.detector();
            let dirty = if all {
                detector.detect_all()
            } else {
                let changes = read_changes(changes_file.as_deref(), paths)?;
                detector.detect(changes.paths())
            };
            print!("{}", render(&dirty, format)?);
            if format != OutputFormat::Lines {
                println!();
            }
        }
        Commands::Patch {
            file,
            section,
            field,
            occurrence,
            value,
            in_place,
        } => {
            let target = PatchTarget::first(section, field).nth(occurrence);
            let text = fs::read_to_string(&file)?;
            let patched = patch_str(&text, &target, &value)?;

            if in_place {
                if patched != text {
                    rollout::write_atomic(&file, &patched)?;
                }
                tracing::info!(path = %file.display(), %target, "Document patched");
            } else {
                print!("{}", patched);
            }
        }
        Commands::Rollout {
            config: config_path,
            root,
            tag,
            all,
            changes_file,
            dry_run,
            paths,
        } => {
            let config = load_config(&config_path)?;
            let detector = config.detector();
            let dirty: DirtySet = if all {
                detector.detect_all()
            } else {
                let changes = read_changes(changes_file.as_deref(), paths)?;
                detector.detect(changes.paths())
            };

            let root = root.unwrap_or_else(|| default_root(&config_path));
            let plan = plan_rollout(&config, &dirty, &tag, &root)?;
            if plan.is_empty() {
                tracing::info!("No units changed; nothing to roll out");
                return Ok(());
            }

            let report = rollout::run(&plan, config.rollout.max_parallel, dry_run).await?;
            for document in &report.documents {
                println!("{}", document.path.display());
                if dry_run {
                    for (line, old, new) in document.changed_lines() {
                        println!("  {line}: -{}", old.trim());
                        println!("  {line}: +{}", new.trim());
                    }
                }
            }
        }
        Commands::Validate { config } => {
            let config = load_config(&config)?;
            println!("OK: {} units", config.units.len());
        }
    }

    Ok(())
}

/// Collect changed paths from positional args, a file, or stdin.
fn read_changes(file: Option<&Path>, paths: Vec<String>) -> io::Result<ChangeSet> {
    let mut all = paths;
    match file {
        Some(p) if p == Path::new("-") => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            all.extend(ChangeSet::parse(&text).paths().iter().cloned());
        }
        Some(p) => {
            let text = fs::read_to_string(p)?;
            all.extend(ChangeSet::parse(&text).paths().iter().cloned());
        }
        None => {}
    }
    Ok(ChangeSet::new(all))
}

fn default_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
