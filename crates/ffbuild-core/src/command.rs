//! External command execution for build steps, plus CI log grouping.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("`{command}` produced non-UTF-8 output")]
    Output { command: String },
}

/// A fully described process invocation. Built as data so plans can be inspected in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, OsString)>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Path argument; stored lossily, which is fine for the ASCII build trees we drive.
    pub fn path_arg(self, path: &Path) -> Self {
        let s = path.to_string_lossy().into_owned();
        self.arg(s)
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn envs(mut self, env: &[(String, OsString)]) -> Self {
        self.env.extend(env.iter().cloned());
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, " {:?}", a)?;
            } else {
                write!(f, " {}", a)?;
            }
        }
        Ok(())
    }
}

/// Run to completion with inherited stdio; non-zero exit is an error.
pub fn run(spec: &CommandSpec) -> Result<(), CommandError> {
    tracing::info!(cwd = ?spec.cwd, "run: {}", spec);
    let status = spec
        .to_command()
        .status()
        .map_err(|source| CommandError::Spawn {
            command: spec.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(CommandError::Failed {
            command: spec.to_string(),
            status,
        });
    }
    Ok(())
}

/// Run and return stdout; stderr is inherited.
pub fn capture(spec: &CommandSpec) -> Result<String, CommandError> {
    tracing::debug!("capture: {}", spec);
    let output = spec
        .to_command()
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| CommandError::Spawn {
            command: spec.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(CommandError::Failed {
            command: spec.to_string(),
            status: output.status,
        });
    }
    String::from_utf8(output.stdout).map_err(|_| CommandError::Output {
        command: spec.to_string(),
    })
}

fn github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").map(|v| v == "true").unwrap_or(false)
}

/// Scoped log section. Under GitHub Actions the console output between
/// construction and drop is folded into a collapsible group.
pub struct LogGroup {
    out: Option<Box<dyn Write>>,
    _span: tracing::span::EnteredSpan,
}

impl LogGroup {
    pub fn new(title: &str) -> Self {
        Self::with_github(title, github_actions(), io::stdout())
    }

    /// Group markers go to `out`, and only when `github` is set.
    pub fn with_github(title: &str, github: bool, out: impl Write + 'static) -> Self {
        let out = if github {
            let mut out: Box<dyn Write> = Box::new(out);
            let _ = writeln!(out, "::group::{}", title);
            let _ = out.flush();
            Some(out)
        } else {
            None
        };
        let span = tracing::info_span!("group", title).entered();
        Self { out, _span: span }
    }
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        if let Some(out) = self.out.as_mut() {
            let _ = writeln!(out, "::endgroup::");
            let _ = out.flush();
        }
    }
}

/// Run `f` inside a [`LogGroup`].
pub fn log_group<T>(title: &str, f: impl FnOnce() -> T) -> T {
    let _group = LogGroup::new(title);
    f()
}
