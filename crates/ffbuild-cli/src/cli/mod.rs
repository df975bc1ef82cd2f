//! CLI for the FFmpeg bundle builder.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ffbuild_core::config::{self, BuildConfig};
use ffbuild_core::package::Profile;
use std::path::PathBuf;

use commands::{run_build, run_checksum, run_fetch, run_list};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "build-ffmpeg")]
#[command(about = "Fetch, verify, build and package FFmpeg with its audio codecs", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/ffbuild/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Build the bundle into DESTINATION and archive it (skipped if the archive exists).
    Build {
        /// Install prefix for all packages.
        destination: PathBuf,

        /// Codec selection: minimal, audio or full.
        #[arg(long, default_value_t = Profile::Minimal)]
        profile: Profile,

        /// Accepted for compatibility with older CI invocations; has no effect.
        #[arg(long)]
        community: bool,

        /// Directory for the output tarball.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Directory where source tarballs are cached.
        #[arg(long, value_name = "DIR")]
        source_dir: Option<PathBuf>,

        /// Scratch directory for unpacked sources.
        #[arg(long, value_name = "DIR")]
        build_dir: Option<PathBuf>,

        /// Parallel build jobs.
        #[arg(long, short = 'j', value_name = "N")]
        jobs: Option<usize>,

        /// Do not `pip install` cmake/meson/ninja first.
        #[arg(long)]
        skip_python_tools: bool,
    },

    /// Download and verify all source tarballs without building.
    Fetch {
        #[arg(long, default_value_t = Profile::Minimal)]
        profile: Profile,

        #[arg(long, value_name = "DIR")]
        source_dir: Option<PathBuf>,
    },

    /// Print the packages and FFmpeg flags of a profile.
    List {
        #[arg(long, default_value_t = Profile::Minimal)]
        profile: Profile,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute SHA-256 of a file (e.g. a tarball to pin).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

fn load_config(path: Option<&std::path::Path>) -> Result<BuildConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Build {
                destination,
                profile,
                community,
                output_dir,
                source_dir,
                build_dir,
                jobs,
                skip_python_tools,
            } => {
                if community {
                    tracing::info!("--community has no effect");
                }
                if let Some(dir) = output_dir {
                    cfg.output_dir = Some(dir);
                }
                if let Some(dir) = source_dir {
                    cfg.source_dir = dir;
                }
                if let Some(dir) = build_dir {
                    cfg.build_dir = dir;
                }
                if jobs.is_some() {
                    cfg.jobs = jobs;
                }
                if skip_python_tools {
                    cfg.install_python_tools = false;
                }
                run_build(destination, profile, cfg).await?;
            }
            CliCommand::Fetch {
                profile,
                source_dir,
            } => {
                if let Some(dir) = source_dir {
                    cfg.source_dir = dir;
                }
                run_fetch(profile, &cfg).await?;
            }
            CliCommand::List { profile, json } => run_list(profile, json)?,
            CliCommand::Checksum { path } => run_checksum(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
