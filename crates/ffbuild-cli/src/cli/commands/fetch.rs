//! `build-ffmpeg fetch` – download and verify tarballs only.

use anyhow::Result;
use ffbuild_core::config::BuildConfig;
use ffbuild_core::package::Profile;
use ffbuild_core::pipeline;

pub async fn run_fetch(profile: Profile, cfg: &BuildConfig) -> Result<()> {
    let tarballs = pipeline::fetch_sources(profile, cfg).await?;
    for path in &tarballs {
        println!("{}", path.display());
    }
    tracing::info!("{} tarball(s) verified", tarballs.len());
    Ok(())
}
