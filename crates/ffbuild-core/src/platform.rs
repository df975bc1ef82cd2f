//! Host platform detection and the per-platform packaging conventions.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl Platform {
    /// Platform of the running host.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
            .ok_or_else(|| anyhow::anyhow!("unsupported host OS: {}", std::env::consts::OS))
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::Darwin),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    /// Wheel-style platform tag used in the output tarball name.
    ///
    /// `arch` is a Rust arch name (`x86_64`, `aarch64`, ...). On Darwin the
    /// second word of `archflags` (e.g. `-arch arm64`) wins when present.
    pub fn tag(self, arch: &str, archflags: Option<&str>, musl: bool) -> String {
        match self {
            Platform::Linux => {
                let machine = match arch {
                    "x86" => "i686",
                    other => other,
                };
                if musl {
                    format!("musllinux_{machine}")
                } else {
                    format!("manylinux_{machine}")
                }
            }
            Platform::Darwin => {
                let from_flags = archflags.and_then(|f| f.split_whitespace().nth(1));
                let machine = match from_flags {
                    Some(m) => m,
                    None if arch == "aarch64" => "arm64",
                    None => arch,
                };
                format!("macosx_{machine}")
            }
            Platform::Windows => match arch {
                "aarch64" => "win_arm64".to_string(),
                "x86" => "win32".to_string(),
                _ => "win_amd64".to_string(),
            },
        }
    }

    /// Directory (relative to the install prefix) and extension of the shared libraries.
    pub fn library_location(self) -> (&'static str, &'static str) {
        match self {
            Platform::Darwin => ("lib", "dylib"),
            Platform::Linux => ("lib", "so"),
            Platform::Windows => ("bin", "dll"),
        }
    }

    /// `strip` flags: debug symbols only on Darwin, everything elsewhere.
    pub fn strip_arguments(self) -> &'static [&'static str] {
        match self {
            Platform::Darwin => &["-S"],
            Platform::Linux | Platform::Windows => &["-s"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Linux => "Linux",
            Platform::Darwin => "Darwin",
            Platform::Windows => "Windows",
        })
    }
}

/// Platform tag of the running host, honouring `ARCHFLAGS` on macOS.
pub fn platform_tag() -> Result<String> {
    let platform = Platform::current()?;
    let archflags = std::env::var("ARCHFLAGS").ok();
    Ok(platform.tag(
        std::env::consts::ARCH,
        archflags.as_deref(),
        cfg!(target_env = "musl"),
    ))
}
