//! Output bundle: where it goes and how it is written.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::platform::Platform;

/// Top-level directories of the install tree that make up the bundle.
pub const BUNDLE_DIRS: &[&str] = &["bin", "include", "lib"];

/// Output directory: the configured one, else `./output` made absolute.
/// Inside a cibuildwheel Linux container it is `/output`, which is mounted from the host.
pub fn output_dir(
    configured: Option<&Path>,
    platform: Platform,
    cibuildwheel: Option<&str>,
) -> Result<PathBuf> {
    if let Some(dir) = configured {
        return Ok(if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        });
    }
    if platform == Platform::Linux && cibuildwheel == Some("1") {
        return Ok(PathBuf::from("/output"));
    }
    Ok(std::env::current_dir()?.join("output"))
}

/// `<output_dir>/ffmpeg-<tag>.tar.gz`
pub fn output_tarball(output_dir: &Path, platform_tag: &str) -> PathBuf {
    output_dir.join(format!("ffmpeg-{platform_tag}.tar.gz"))
}

/// Write a gzip tarball of `bin`, `include` and `lib` under `dest_dir`.
///
/// Entry paths are relative to `dest_dir`. The archive is written next to
/// `tarball` under a temporary name and renamed on success. Returns the
/// number of regular files archived.
pub fn create_tarball(dest_dir: &Path, tarball: &Path) -> Result<usize> {
    for dir in BUNDLE_DIRS {
        let path = dest_dir.join(dir);
        if !path.is_dir() {
            anyhow::bail!("cannot archive: {} is missing", path.display());
        }
    }
    if let Some(parent) = tarball.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }

    let mut tmp_name = tarball.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = tarball.with_file_name(tmp_name);

    let res = write_archive(dest_dir, &tmp);
    let count = match res {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    fs::rename(&tmp, tarball)
        .with_context(|| format!("rename {} -> {}", tmp.display(), tarball.display()))?;
    tracing::info!("wrote {} ({} files)", tarball.display(), count);
    Ok(count)
}

fn write_archive(dest_dir: &Path, out: &Path) -> Result<usize> {
    let file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut count = 0;
    for dir in BUNDLE_DIRS {
        count += append_tree(&mut builder, dest_dir, Path::new(dir))?;
    }

    let encoder = builder.into_inner().context("finish tar stream")?;
    encoder.finish().context("finish gzip stream")?;
    Ok(count)
}

/// Append `rel` (relative to `root`) and everything below it, in sorted order.
fn append_tree<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    rel: &Path,
) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(root.join(rel)).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.join(rel).display()))?;
        let path = entry.path();
        let name = path.strip_prefix(root)?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder
                .append_dir(name, path)
                .with_context(|| format!("archive {}", path.display()))?;
        } else {
            // symlinks (e.g. libfoo.so -> libfoo.so.1) are stored as links
            builder
                .append_path_with_name(path, name)
                .with_context(|| format!("archive {}", path.display()))?;
            if file_type.is_file() {
                count += 1;
            }
        }
        tracing::debug!("a {}", name.display());
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn entry_names(tarball: &Path) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(tarball).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                e.path().unwrap().to_string_lossy().trim_end_matches('/').to_string()
            })
            .collect()
    }

    fn make_tree(dest: &Path) {
        for d in BUNDLE_DIRS {
            fs::create_dir_all(dest.join(d)).unwrap();
        }
        fs::create_dir_all(dest.join("include/libavcodec")).unwrap();
        fs::write(dest.join("include/libavcodec/avcodec.h"), b"/* h */").unwrap();
        fs::write(dest.join("lib/libavcodec.so"), b"elf").unwrap();
        fs::create_dir_all(dest.join("share/doc")).unwrap();
        fs::write(dest.join("share/doc/readme"), b"skip me").unwrap();
    }

    #[test]
    fn tarball_name_uses_platform_tag() {
        assert_eq!(
            output_tarball(Path::new("/out"), "manylinux_x86_64"),
            PathBuf::from("/out/ffmpeg-manylinux_x86_64.tar.gz")
        );
    }

    #[test]
    fn output_dir_resolution() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            output_dir(None, Platform::Linux, None).unwrap(),
            cwd.join("output")
        );
        assert_eq!(
            output_dir(None, Platform::Linux, Some("1")).unwrap(),
            PathBuf::from("/output")
        );
        assert_eq!(
            output_dir(None, Platform::Darwin, Some("1")).unwrap(),
            cwd.join("output")
        );
        assert_eq!(
            output_dir(Some(Path::new("dist")), Platform::Linux, Some("1")).unwrap(),
            cwd.join("dist")
        );
    }

    #[test]
    fn archives_only_bundle_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        make_tree(&dest);
        let tarball = dir.path().join("out/ffmpeg-test.tar.gz");

        let count = create_tarball(&dest, &tarball).unwrap();
        assert_eq!(count, 2);
        let names = entry_names(&tarball);
        assert_eq!(names[0], "bin");
        assert!(names.contains(&"include/libavcodec/avcodec.h".to_string()));
        assert!(names.contains(&"lib/libavcodec.so".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("share")));
        assert!(!dir.path().join("out/ffmpeg-test.tar.gz.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_stored_as_links_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        make_tree(&dest);
        fs::write(dest.join("lib/libogg.so.0.8.5"), b"elf").unwrap();
        std::os::unix::fs::symlink("libogg.so.0.8.5", dest.join("lib/libogg.so.0")).unwrap();
        let tarball = dir.path().join("ffmpeg.tar.gz");

        // the link is not counted as a regular file
        assert_eq!(create_tarball(&dest, &tarball).unwrap(), 3);

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&tarball).unwrap()));
        let mut lib_entries = Vec::new();
        for e in archive.entries().unwrap() {
            let e = e.unwrap();
            let name = e.path().unwrap().to_string_lossy().trim_end_matches('/').to_string();
            if name.starts_with("lib/") {
                let kind = e.header().entry_type();
                let target = e.link_name().unwrap().map(|p| p.to_string_lossy().into_owned());
                lib_entries.push((name, kind.is_symlink(), target));
            }
        }
        assert_eq!(
            lib_entries,
            [
                ("lib/libavcodec.so".to_string(), false, None),
                ("lib/libogg.so.0".to_string(), true, Some("libogg.so.0.8.5".to_string())),
                ("lib/libogg.so.0.8.5".to_string(), false, None),
            ]
        );
    }

    #[test]
    fn missing_bundle_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir_all(dest.join("bin")).unwrap();
        let tarball = dir.path().join("ffmpeg.tar.gz");
        assert!(create_tarball(&dest, &tarball).is_err());
        assert!(!tarball.exists());
    }
}
