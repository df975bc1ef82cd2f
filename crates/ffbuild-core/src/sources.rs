//! Source tarball cache: fetch every package's tarball and verify its SHA-256.
//!
//! Tarballs already present in the source directory are never downloaded
//! again but are always re-hashed, so a corrupted cache fails loudly.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::fetch::{fetch, FetchOptions};
use crate::package::Package;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("tarball doesn't exist: {}", path.display())]
    Missing { path: PathBuf },
}

/// Absolute location of `package`'s tarball inside `source_dir`.
pub fn tarball_path(source_dir: &Path, package: &Package) -> Result<PathBuf> {
    let dir = if source_dir.is_absolute() {
        source_dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(source_dir)
    };
    Ok(dir.join(package.tarball_name()?))
}

/// Make sure the tarball for `package` is present and matches its pinned digest.
///
/// A failed download is only logged here; the existence check that follows
/// turns it into [`SourceError::Missing`].
pub fn download_and_verify_package(
    package: &Package,
    source_dir: &Path,
    opts: &FetchOptions,
) -> Result<PathBuf> {
    let tarball = tarball_path(source_dir, package)?;

    if !tarball.exists() {
        if let Err(e) = fetch(&package.source_url, &tarball, opts) {
            tracing::warn!(package = %package.name, "download failed: {:#}", e);
        }
    }

    if !tarball.exists() {
        return Err(SourceError::Missing { path: tarball }.into());
    }

    checksum::verify_sha256(&package.name, &tarball, &package.sha256)?;
    tracing::info!("{} tarball: hashes match", package.name);
    Ok(tarball)
}

/// Download and verify all `packages` with at most `max_concurrent` in flight.
///
/// Results are consumed in completion order. The first failure is logged as
/// `<name> generated an exception: ...` and returned once the downloads still
/// in flight have finished. Queued packages are not started.
pub async fn download_tars(
    packages: &[Package],
    source_dir: &Path,
    opts: &FetchOptions,
    max_concurrent: usize,
) -> Result<Vec<PathBuf>> {
    let max_concurrent = max_concurrent.max(1);
    let mut queue: VecDeque<Package> = packages.iter().cloned().collect();
    let mut join_set = tokio::task::JoinSet::new();
    let mut tarballs = Vec::with_capacity(packages.len());

    loop {
        while join_set.len() < max_concurrent {
            let Some(package) = queue.pop_front() else {
                break;
            };
            let source_dir = source_dir.to_path_buf();
            let opts = opts.clone();
            join_set.spawn_blocking(move || {
                let res = download_and_verify_package(&package, &source_dir, &opts);
                (package.name, res)
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (name, res) = joined.context("download task panicked")?;
        match res {
            Ok(path) => tarballs.push(path),
            Err(e) => {
                tracing::error!("{} generated an exception: {:#}", name, e);
                queue.clear();
                // let transfers already in flight finish so no .part files are left behind
                while let Some(other) = join_set.join_next().await {
                    if let Ok((other_name, Err(other_err))) = other {
                        tracing::debug!("{} also failed: {:#}", other_name, other_err);
                    }
                }
                return Err(e.context(format!("fetching {}", name)));
            }
        }
    }

    Ok(tarballs)
}
