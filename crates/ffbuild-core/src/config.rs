use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Download retry parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per tarball (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_true() -> bool {
    true
}

fn default_python_tools() -> Vec<String> {
    ["cmake==3.31.6", "meson", "ninja"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Global configuration loaded from `~/.config/ffbuild/config.toml`.
/// Relative directories are resolved against the working directory at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Where source tarballs are cached.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Scratch directory for unpacked sources and the build-tools prefix.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Output directory for the bundle tarball (None = `./output`, or `/output` under cibuildwheel on Linux).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Maximum concurrent tarball downloads (None = min(32, cpus + 4)).
    #[serde(default)]
    pub max_parallel_downloads: Option<usize>,
    /// Parallel jobs passed to make/cmake/ninja (None = available parallelism).
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Run `pip install` for the Python-distributed build tools before building.
    #[serde(default = "default_true")]
    pub install_python_tools: bool,
    /// Requirements handed to `pip install`.
    #[serde(default = "default_python_tools")]
    pub python_tools: Vec<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            build_dir: default_build_dir(),
            output_dir: None,
            max_parallel_downloads: None,
            jobs: None,
            install_python_tools: true,
            python_tools: default_python_tools(),
            retry: None,
        }
    }
}

impl BuildConfig {
    /// Download worker count, mirroring a thread-pool default of min(32, cpus + 4).
    pub fn download_workers(&self) -> usize {
        match self.max_parallel_downloads {
            Some(n) => n.max(1),
            None => (available_cpus() + 4).min(32),
        }
    }

    /// Build job count for make/cmake/ninja.
    pub fn build_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(available_cpus).max(1)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ffbuild")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BuildConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BuildConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from_path(path: &Path) -> Result<BuildConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: BuildConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
