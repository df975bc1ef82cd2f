//! Command plans for the three supported native build systems.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::command::CommandSpec;
use crate::package::{BuildSystem, Package};

/// Everything a plan needs to know about where a package is built and installed.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    /// Unpacked source tree.
    pub source: PathBuf,
    /// Install prefix.
    pub prefix: PathBuf,
    /// Build tools keep the build system's default linkage; targets are forced shared.
    pub for_builder: bool,
    /// Parallel jobs after applying the package's `build_parallel`.
    pub jobs: usize,
}

impl BuildLayout {
    fn prefix_str(&self) -> String {
        self.prefix.to_string_lossy().into_owned()
    }
}

/// Effective job count for `package`.
pub fn effective_jobs(package: &Package, jobs: usize) -> usize {
    if package.build_parallel {
        jobs.max(1)
    } else {
        1
    }
}

/// Prepend `first` to an existing search-path style variable.
fn prepend_path(first: &Path, existing: Option<OsString>) -> OsString {
    let mut paths = vec![first.to_path_buf()];
    if let Some(existing) = existing {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths).unwrap_or_else(|_| first.as_os_str().to_os_string())
}

/// Prepend `flag` to a whitespace-separated flags variable.
fn prepend_flag(flag: String, existing: Option<OsString>) -> OsString {
    match existing.filter(|v| !v.is_empty()) {
        Some(v) => {
            let mut out = OsString::from(flag);
            out.push(" ");
            out.push(v);
            out
        }
        None => OsString::from(flag),
    }
}

/// Environment for every build step: tools first on PATH, headers and libraries
/// of already-built packages visible through pkg-config and the compiler flags.
pub fn build_env(dest_dir: &Path, tools_dir: &Path) -> Vec<(String, OsString)> {
    let var = |k: &str| std::env::var_os(k);
    vec![
        (
            "PATH".to_string(),
            prepend_path(&tools_dir.join("bin"), var("PATH")),
        ),
        (
            "PKG_CONFIG_PATH".to_string(),
            prepend_path(&dest_dir.join("lib").join("pkgconfig"), var("PKG_CONFIG_PATH")),
        ),
        (
            "CPPFLAGS".to_string(),
            prepend_flag(
                format!("-I{}", dest_dir.join("include").display()),
                var("CPPFLAGS"),
            ),
        ),
        (
            "LDFLAGS".to_string(),
            prepend_flag(
                format!("-L{}", dest_dir.join("lib").display()),
                var("LDFLAGS"),
            ),
        ),
    ]
}

/// Configure, compile and install steps for `package`, in order.
pub fn plan_build(package: &Package, layout: &BuildLayout) -> Vec<CommandSpec> {
    match package.build_system {
        BuildSystem::Autoconf => plan_autoconf(package, layout),
        BuildSystem::Cmake => plan_cmake(package, layout),
        BuildSystem::Meson => plan_meson(package, layout),
    }
}

fn plan_autoconf(package: &Package, layout: &BuildLayout) -> Vec<CommandSpec> {
    let mut configure = CommandSpec::new("sh")
        .arg("./configure")
        .arg(format!("--prefix={}", layout.prefix_str()));
    if !layout.for_builder {
        configure = configure.args(["--disable-static", "--enable-shared"]);
    }
    configure = configure.args(package.build_arguments.iter().cloned());

    vec![
        configure.current_dir(&layout.source),
        CommandSpec::new("make")
            .arg(format!("-j{}", layout.jobs))
            .current_dir(&layout.source),
        CommandSpec::new("make")
            .arg("install")
            .current_dir(&layout.source),
    ]
}

fn plan_cmake(package: &Package, layout: &BuildLayout) -> Vec<CommandSpec> {
    let build = layout.source.join("build");
    let mut configure = CommandSpec::new("cmake")
        .arg("-S")
        .path_arg(&layout.source)
        .arg("-B")
        .path_arg(&build)
        .arg(format!("-DCMAKE_INSTALL_PREFIX={}", layout.prefix_str()))
        .arg("-DCMAKE_INSTALL_LIBDIR=lib")
        .arg("-DCMAKE_BUILD_TYPE=Release");
    if !layout.for_builder {
        configure = configure.arg("-DBUILD_SHARED_LIBS=ON");
    }
    configure = configure.args(package.build_arguments.iter().cloned());

    vec![
        configure.current_dir(&layout.source),
        CommandSpec::new("cmake")
            .arg("--build")
            .path_arg(&build)
            .arg("--parallel")
            .arg(layout.jobs.to_string())
            .current_dir(&layout.source),
        CommandSpec::new("cmake")
            .arg("--install")
            .path_arg(&build)
            .current_dir(&layout.source),
    ]
}

fn plan_meson(package: &Package, layout: &BuildLayout) -> Vec<CommandSpec> {
    let build = layout.source.join("build");
    let mut setup = CommandSpec::new("meson")
        .arg("setup")
        .path_arg(&build)
        .path_arg(&layout.source)
        .arg(format!("--prefix={}", layout.prefix_str()))
        .arg("--libdir=lib")
        .arg("--buildtype=release");
    if !layout.for_builder {
        setup = setup.arg("-Ddefault_library=shared");
    }
    setup = setup.args(package.build_arguments.iter().cloned());

    vec![
        setup.current_dir(&layout.source),
        CommandSpec::new("ninja")
            .arg("-C")
            .path_arg(&build)
            .arg("-j")
            .arg(layout.jobs.to_string())
            .current_dir(&layout.source),
        CommandSpec::new("ninja")
            .arg("-C")
            .path_arg(&build)
            .arg("install")
            .current_dir(&layout.source),
    ]
}
