//! The full run: tools, downloads, builds, post-processing and the bundle tarball.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::archive;
use crate::builder::Builder;
use crate::config::BuildConfig;
use crate::fetch::FetchOptions;
use crate::package::{Package, Profile};
use crate::platform::{self, Platform};
use crate::postprocess;
use crate::retry::RetryPolicy;
use crate::sources;
use crate::tools;

/// Inputs of one bundle build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Install prefix that ends up in the bundle.
    pub dest_dir: PathBuf,
    pub profile: Profile,
    pub config: BuildConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The output tarball already existed; nothing was done.
    Skipped(PathBuf),
    Built(PathBuf),
}

pub fn fetch_options(cfg: &BuildConfig) -> FetchOptions {
    FetchOptions {
        retry: RetryPolicy::from(&cfg.retry_config()),
        ..FetchOptions::default()
    }
}

/// Every tarball a build on `platform` with `profile` needs: tools first.
pub fn all_packages(profile: Profile, platform: Platform) -> Vec<Package> {
    let mut packages = tools::build_tool_packages(&tools::available_tools(platform));
    packages.extend(profile.packages(platform));
    packages
}

/// Download and verify every tarball for `profile` without building anything.
pub async fn fetch_sources(profile: Profile, cfg: &BuildConfig) -> Result<Vec<PathBuf>> {
    let platform = Platform::current()?;
    let packages = all_packages(profile, platform);
    sources::download_tars(
        &packages,
        &cfg.source_dir,
        &fetch_options(cfg),
        cfg.download_workers(),
    )
    .await
}

/// Location of the bundle this host would produce.
pub fn resolve_output_tarball(cfg: &BuildConfig) -> Result<PathBuf> {
    let platform = Platform::current()?;
    let cibuildwheel = std::env::var("CIBUILDWHEEL").ok();
    let dir = archive::output_dir(cfg.output_dir.as_deref(), platform, cibuildwheel.as_deref())?;
    Ok(archive::output_tarball(&dir, &platform::platform_tag()?))
}

/// Build the bundle described by `req`, skipping everything if it already exists.
pub async fn run_build(req: BuildRequest) -> Result<BuildOutcome> {
    let platform = Platform::current()?;
    let tarball = resolve_output_tarball(&req.config)?;
    if tarball.exists() {
        tracing::info!("{} already exists, nothing to do", tarball.display());
        return Ok(BuildOutcome::Skipped(tarball));
    }
    tracing::info!(
        profile = %req.profile,
        %platform,
        dest = %req.dest_dir.display(),
        "building {}",
        tarball.display()
    );

    let cfg = req.config.clone();
    let mut builder = Builder::new(&req.dest_dir, &cfg.build_dir, &cfg.source_dir, cfg.build_jobs())?;
    builder.create_directories()?;

    let build_tools = tokio::task::spawn_blocking({
        let cfg = cfg.clone();
        move || tools::prepare_tools(platform, cfg.install_python_tools, &cfg.python_tools)
    })
    .await
    .context("tool preparation task panicked")??;

    let packages = req.profile.packages(platform);
    let mut to_fetch = build_tools.clone();
    to_fetch.extend(packages.iter().cloned());
    sources::download_tars(
        &to_fetch,
        &cfg.source_dir,
        &fetch_options(&cfg),
        cfg.download_workers(),
    )
    .await?;

    let out = tarball.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        for tool in &build_tools {
            builder.build(tool, true)?;
        }
        for package in &packages {
            builder.build(package, false)?;
        }
        finalize(builder.dest_dir(), platform)?;
        archive::create_tarball(builder.dest_dir(), &out)?;
        Ok(())
    })
    .await
    .context("build task panicked")??;

    Ok(BuildOutcome::Built(tarball))
}

/// Post-build fix-ups and stripping.
pub fn finalize(dest_dir: &Path, platform: Platform) -> Result<()> {
    if platform == Platform::Windows {
        postprocess::windows_postprocess(dest_dir)?;
    }
    let libraries = postprocess::find_libraries(dest_dir, platform)?;
    postprocess::strip_libraries(platform, &libraries)
}
