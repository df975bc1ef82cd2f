//! Platform-specific fix-ups of the installed tree before it is archived.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{self, CommandSpec};
use crate::platform::Platform;

/// FFmpeg libraries whose MSVC import libraries land in `bin/` on Windows.
const FFMPEG_LIBRARIES: &[&str] = &[
    "avcodec",
    "avdevice",
    "avfilter",
    "avformat",
    "avutil",
    "postproc",
    "swresample",
    "swscale",
];

/// MinGW runtime DLLs the FFmpeg DLLs link against.
const MINGW_RUNTIME_DLLS: &[&str] = &[
    "libgcc_s_seh-1.dll",
    "libiconv-2.dll",
    "libstdc++-6.dll",
    "libwinpthread-1.dll",
    "zlib1.dll",
];

/// Move `bin/<name>.lib` into `lib/`. Returns the names that were moved.
pub fn relocate_import_libraries(dest_dir: &Path) -> Result<Vec<String>> {
    let lib_dir = dest_dir.join("lib");
    let mut moved = Vec::new();
    for name in FFMPEG_LIBRARIES {
        let src = dest_dir.join("bin").join(format!("{name}.lib"));
        if !src.exists() {
            continue;
        }
        fs::create_dir_all(&lib_dir)?;
        let dst = lib_dir.join(format!("{name}.lib"));
        fs::rename(&src, &dst)
            .with_context(|| format!("move {} -> {}", src.display(), dst.display()))?;
        tracing::debug!("moved {} to {}", src.display(), dst.display());
        moved.push(name.to_string());
    }
    Ok(moved)
}

/// Copy the MinGW runtime DLLs that exist in `mingw_bindir` into `dest/bin`.
pub fn copy_mingw_runtime(mingw_bindir: &Path, dest_dir: &Path) -> Result<Vec<String>> {
    let bin = dest_dir.join("bin");
    let mut copied = Vec::new();
    for name in MINGW_RUNTIME_DLLS {
        let src = mingw_bindir.join(name);
        if src.exists() {
            fs::copy(&src, bin.join(name))
                .with_context(|| format!("copy {}", src.display()))?;
            copied.push(name.to_string());
        }
    }
    Ok(copied)
}

/// Directory of the first `gcc` reported by `where gcc`.
fn locate_mingw_bindir() -> Result<PathBuf> {
    let out = command::capture(&CommandSpec::new("where").arg("gcc"))?;
    let first = out
        .lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| anyhow::anyhow!("`where gcc` printed nothing"))?;
    Path::new(first)
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("gcc path {} has no parent", first))
}

/// Windows-only fix-ups. Failing to copy the MinGW runtime is only a warning.
pub fn windows_postprocess(dest_dir: &Path) -> Result<()> {
    relocate_import_libraries(dest_dir)?;
    match locate_mingw_bindir().and_then(|dir| copy_mingw_runtime(&dir, dest_dir)) {
        Ok(copied) => tracing::info!("copied MinGW runtime: {:?}", copied),
        Err(e) => tracing::warn!("Could not copy MinGW DLLs: {:#}", e),
    }
    Ok(())
}

/// Shared libraries in the installed tree, sorted by path.
pub fn find_libraries(dest_dir: &Path, platform: Platform) -> Result<Vec<PathBuf>> {
    let (dir, ext) = platform.library_location();
    let dir = dest_dir.join(dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut libraries = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            libraries.push(path);
        }
    }
    libraries.sort();
    Ok(libraries)
}

/// `strip` invocation for `libraries`, or None when there is nothing to strip.
pub fn strip_command(platform: Platform, libraries: &[PathBuf]) -> Option<CommandSpec> {
    if libraries.is_empty() {
        return None;
    }
    let mut cmd = CommandSpec::new("strip").args(platform.strip_arguments().iter().copied());
    for lib in libraries {
        cmd = cmd.path_arg(lib);
    }
    Some(cmd)
}

/// Strip `libraries`; on Darwin also print their load commands (best effort).
pub fn strip_libraries(platform: Platform, libraries: &[PathBuf]) -> Result<()> {
    let Some(strip) = strip_command(platform, libraries) else {
        tracing::info!("no libraries to strip");
        return Ok(());
    };
    command::run(&strip).context("stripping libraries")?;

    if platform == Platform::Darwin {
        let mut otool = CommandSpec::new("otool").arg("-L");
        for lib in libraries {
            otool = otool.path_arg(lib);
        }
        if let Err(e) = command::run(&otool) {
            tracing::debug!("otool -L failed: {}", e);
        }
    }
    Ok(())
}
