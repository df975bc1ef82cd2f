//! `build-ffmpeg build` – the full pipeline.

use anyhow::Result;
use ffbuild_core::config::BuildConfig;
use ffbuild_core::package::Profile;
use ffbuild_core::pipeline::{self, BuildOutcome, BuildRequest};
use std::path::PathBuf;

pub async fn run_build(dest_dir: PathBuf, profile: Profile, cfg: BuildConfig) -> Result<()> {
    let outcome = pipeline::run_build(BuildRequest {
        dest_dir,
        profile,
        config: cfg,
    })
    .await?;

    match outcome {
        BuildOutcome::Skipped(path) => println!("{} already exists, skipped", path.display()),
        BuildOutcome::Built(path) => println!("{}", path.display()),
    }
    Ok(())
}
