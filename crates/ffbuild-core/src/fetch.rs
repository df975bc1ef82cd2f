//! Single-stream HTTP GET of a source tarball.
//!
//! The body is written to `<dest>.part` and renamed into place only after a
//! 2xx response, so an interrupted transfer never leaves a file at `dest`.

use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Transfer settings shared by all downloads of a run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    /// Abort when the transfer stays below 1 KiB/s for this long.
    pub low_speed_time: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            user_agent: format!("ffbuild/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Downloads `url` to `dest`, retrying transient failures. Returns bytes written.
pub fn fetch(url: &str, dest: &Path, opts: &FetchOptions) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let part = part_path(dest);
    tracing::info!(url, dest = %dest.display(), "downloading");

    let written = run_with_retry(&opts.retry, |attempt| {
        if attempt > 1 {
            tracing::debug!(url, attempt, "download attempt");
        }
        fetch_once(url, &part, opts)
    });
    let written = match written {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(anyhow::Error::new(e).context(format!("GET {}", url)));
        }
    };

    fs::rename(&part, dest)
        .with_context(|| format!("rename {} -> {}", part.display(), dest.display()))?;
    tracing::debug!(url, bytes = written, "download complete");
    Ok(written)
}

fn fetch_once(url: &str, part: &Path, opts: &FetchOptions) -> Result<u64, FetchError> {
    let mut file = File::create(part)?;
    let mut written = 0u64;
    let mut write_err: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(&opts.user_agent)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(opts.low_speed_time)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                write_err = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        let performed = transfer.perform();
        drop(transfer);
        if let Some(e) = write_err.take() {
            return Err(FetchError::Io(e));
        }
        performed?;
    }

    let code = easy.response_code()?;
    // file:// and similar schemes report 0
    if code != 0 && !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    file.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/src/opus-1.6.tar.gz")),
            PathBuf::from("/src/opus-1.6.tar.gz.part")
        );
    }

    #[test]
    fn fetch_file_url_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("origin.tar.gz");
        fs::write(&src, b"tarball bytes").unwrap();
        let url = url::Url::from_file_path(&src).unwrap();
        let dest = dir.path().join("cache").join("copy.tar.gz");

        let n = fetch(url.as_str(), &dest, &FetchOptions::default()).unwrap();
        assert_eq!(n, 13);
        assert_eq!(fs::read(&dest).unwrap(), b"tarball bytes");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn missing_file_url_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let url = url::Url::from_file_path(dir.path().join("absent.tar.gz")).unwrap();
        let dest = dir.path().join("out.tar.gz");
        let opts = FetchOptions {
            retry: RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
            ..FetchOptions::default()
        };
        assert!(fetch(url.as_str(), &dest, &opts).is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
