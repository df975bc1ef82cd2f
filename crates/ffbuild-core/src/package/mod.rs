//! Package metadata: where a source tarball lives, how to check it and how to build it.

mod catalog;
mod profile;

pub use catalog::{ffmpeg_package, gperf_package, CodecId};
pub use profile::Profile;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Native build system a package ships with. The builder only invokes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    #[default]
    Autoconf,
    Cmake,
    Meson,
}

/// One source distribution to fetch, verify and build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub source_url: String,
    /// Local tarball name; falls back to the last URL path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    /// Expected SHA-256 of the tarball, lowercase hex.
    pub sha256: String,
    #[serde(default)]
    pub build_system: BuildSystem,
    #[serde(default)]
    pub build_arguments: Vec<String>,
    /// Packages that must be built (earlier in the same run) before this one.
    #[serde(default)]
    pub requires: Vec<String>,
    /// When false the build runs with a single job.
    pub build_parallel: bool,
}

impl Package {
    pub fn new(name: &str, source_url: &str, sha256: &str) -> Self {
        Self {
            name: name.to_string(),
            source_url: source_url.to_string(),
            source_filename: None,
            sha256: sha256.to_string(),
            build_system: BuildSystem::Autoconf,
            build_arguments: Vec::new(),
            requires: Vec::new(),
            build_parallel: true,
        }
    }

    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_arguments = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_build_system(mut self, build_system: BuildSystem) -> Self {
        self.build_system = build_system;
        self
    }

    pub fn with_requires(mut self, requires: &[&str]) -> Self {
        self.requires = requires.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_source_filename(mut self, filename: &str) -> Self {
        self.source_filename = Some(filename.to_string());
        self
    }

    pub fn with_build_parallel(mut self, parallel: bool) -> Self {
        self.build_parallel = parallel;
        self
    }

    /// File name of the tarball inside the source directory.
    pub fn tarball_name(&self) -> Result<String> {
        if let Some(name) = self.source_filename.as_deref().filter(|s| !s.is_empty()) {
            return Ok(name.to_string());
        }
        filename_from_url_path(&self.source_url).ok_or_else(|| {
            anyhow::anyhow!(
                "cannot derive tarball name for {} from {}",
                self.name,
                self.source_url
            )
        })
    }
}

/// Extracts the last path segment from a URL. Query and fragment are ignored.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
