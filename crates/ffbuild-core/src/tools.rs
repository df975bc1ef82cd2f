//! Build-time tools: Python-distributed build systems and gperf.

use anyhow::{Context, Result};

use crate::command::{self, log_group, CommandSpec};
use crate::package::{gperf_package, Package};
use crate::platform::Platform;

/// Tools the MinGW environment on Windows runners must provide.
const WINDOWS_REQUIRED_TOOLS: &[&str] = &["gcc", "g++", "curl", "gperf", "ld", "pkg-config"];

/// Tools already present on the host, so not built from source.
pub fn available_tools(platform: Platform) -> Vec<&'static str> {
    match platform {
        Platform::Windows => vec!["gperf"],
        Platform::Linux | Platform::Darwin => Vec::new(),
    }
}

/// Build-tool packages to compile into the tools prefix.
pub fn build_tool_packages(available: &[&str]) -> Vec<Package> {
    let mut tools = Vec::new();
    if !available.contains(&"gperf") {
        tools.push(gperf_package());
    }
    tools
}

fn pip_install(requirements: &[String]) -> CommandSpec {
    CommandSpec::new("pip")
        .arg("install")
        .args(requirements.iter().cloned())
}

/// Check the host toolchain and install the Python build tools.
/// Returns the tool packages that still have to be built.
pub fn prepare_tools(
    platform: Platform,
    install_python_tools: bool,
    python_tools: &[String],
) -> Result<Vec<Package>> {
    let available = available_tools(platform);

    if platform == Platform::Windows {
        tracing::info!(
            "PATH {}",
            std::env::var("PATH").unwrap_or_default()
        );
        for tool in WINDOWS_REQUIRED_TOOLS {
            command::run(&CommandSpec::new("where").arg(*tool))
                .with_context(|| format!("required tool {} not found", tool))?;
        }
    }

    if install_python_tools && !python_tools.is_empty() {
        log_group("install python packages", || command::run(&pip_install(python_tools)))
            .context("installing python build tools")?;
    } else {
        tracing::debug!("skipping python build tool installation");
    }

    Ok(build_tool_packages(&available))
}
