//! Package builder: unpack a verified tarball and drive its native build system.
//!
//! Target packages install into the destination tree; build tools install
//! into a private prefix under the build directory whose `bin/` is put first
//! on `PATH` for every later step.

mod plan;

pub use plan::{build_env, effective_jobs, plan_build, BuildLayout};

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{self, CommandSpec, LogGroup};
use crate::package::Package;
use crate::sources;

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Builds packages one at a time, in the order they are handed in.
#[derive(Debug)]
pub struct Builder {
    dest_dir: PathBuf,
    build_dir: PathBuf,
    source_dir: PathBuf,
    tools_dir: PathBuf,
    jobs: usize,
    built: HashSet<String>,
}

impl Builder {
    /// Relative directories are resolved against the current working directory.
    pub fn new(dest_dir: &Path, build_dir: &Path, source_dir: &Path, jobs: usize) -> Result<Self> {
        let build_dir = absolute(build_dir)?;
        Ok(Self {
            dest_dir: absolute(dest_dir)?,
            tools_dir: build_dir.join("tools"),
            build_dir,
            source_dir: absolute(source_dir)?,
            jobs: jobs.max(1),
            built: HashSet::new(),
        })
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn is_built(&self, name: &str) -> bool {
        self.built.contains(name)
    }

    /// Create the build, tools and destination trees.
    pub fn create_directories(&self) -> Result<()> {
        let dirs = [
            self.build_dir.clone(),
            self.tools_dir.clone(),
            self.dest_dir.join("bin"),
            self.dest_dir.join("include"),
            self.dest_dir.join("lib"),
        ];
        for dir in &dirs {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    fn layout(&self, package: &Package, for_builder: bool) -> BuildLayout {
        BuildLayout {
            source: self.build_dir.join(&package.name),
            prefix: if for_builder {
                self.tools_dir.clone()
            } else {
                self.dest_dir.clone()
            },
            for_builder,
            jobs: effective_jobs(package, self.jobs),
        }
    }

    /// All commands `build` would run for `package`, extraction first.
    pub fn plan(&self, package: &Package, for_builder: bool) -> Result<Vec<CommandSpec>> {
        let layout = self.layout(package, for_builder);
        let tarball = sources::tarball_path(&self.source_dir, package)?;
        let extract = CommandSpec::new("tar")
            .arg("xf")
            .path_arg(&tarball)
            .arg("-C")
            .path_arg(&layout.source)
            .arg("--strip-components=1");

        let env = build_env(&self.dest_dir, &self.tools_dir);
        let mut steps = vec![extract];
        steps.extend(
            plan_build(package, &layout)
                .into_iter()
                .map(|step| step.envs(&env)),
        );
        Ok(steps)
    }

    fn check_requirements(&self, package: &Package) -> Result<()> {
        for dep in &package.requires {
            if !self.built.contains(dep) {
                anyhow::bail!(
                    "package {} requires {}, which has not been built",
                    package.name,
                    dep
                );
            }
        }
        Ok(())
    }

    /// Unpack and build `package`. With `for_builder` the result is installed
    /// into the tools prefix instead of the destination tree.
    pub fn build(&mut self, package: &Package, for_builder: bool) -> Result<()> {
        self.check_requirements(package)?;
        let _group = LogGroup::new(&format!("build {}", package.name));

        let source = self.layout(package, for_builder).source;
        if source.exists() {
            fs::remove_dir_all(&source)
                .with_context(|| format!("clean {}", source.display()))?;
        }
        fs::create_dir_all(&source).with_context(|| format!("create {}", source.display()))?;

        for step in self.plan(package, for_builder)? {
            command::run(&step).with_context(|| format!("building {}", package.name))?;
        }

        tracing::info!(package = %package.name, for_builder, "built");
        self.built.insert(package.name.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(root: &Path) -> Builder {
        Builder::new(
            &root.join("dest"),
            &root.join("build"),
            &root.join("source"),
            4,
        )
        .unwrap()
    }

    #[test]
    fn create_directories_makes_install_tree() {
        let dir = tempfile::tempdir().unwrap();
        let b = builder(dir.path());
        b.create_directories().unwrap();
        for sub in ["dest/bin", "dest/include", "dest/lib", "build/tools"] {
            assert!(dir.path().join(sub).is_dir(), "{sub}");
        }
    }

    #[test]
    fn plan_extracts_then_builds_into_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let b = builder(dir.path());
        let p = Package::new("opus", "https://example.com/opus-1.6.tar.gz", "00");

        let steps = b.plan(&p, false).unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].program, "tar");
        assert_eq!(
            steps[0].args[1],
            dir.path().join("source").join("opus-1.6.tar.gz").to_string_lossy()
        );
        assert_eq!(steps[0].args.last().unwrap(), "--strip-components=1");
        let prefix = format!("--prefix={}", dir.path().join("dest").display());
        assert!(steps[1].args.contains(&prefix));
        assert!(steps[1].env.iter().any(|(k, _)| k == "PKG_CONFIG_PATH"));

        let tool_steps = b.plan(&p, true).unwrap();
        let prefix = format!("--prefix={}", b.tools_dir().display());
        assert!(tool_steps[1].args.contains(&prefix));
    }

    #[test]
    fn missing_requirement_is_rejected_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path());
        let vorbis = Package::new("vorbis", "https://example.com/libvorbis-1.3.7.tar.gz", "00")
            .with_requires(&["ogg"]);
        let err = b.build(&vorbis, false).unwrap_err();
        assert!(err.to_string().contains("requires ogg"));
        assert!(!dir.path().join("build").join("vorbis").exists());
        assert!(!b.is_built("vorbis"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_step_aborts_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path());
        b.create_directories().unwrap();
        // no tarball in the source dir: the extraction step fails
        let p = Package::new("ghost", "https://example.com/ghost-1.0.tar.gz", "00");
        assert!(b.build(&p, false).is_err());
        assert!(!b.is_built("ghost"));
    }

    /// `<name>-1.0.tar.gz` whose configure writes a Makefile installing `lib/lib<name>.so`.
    #[cfg(unix)]
    fn write_fake_tarball(source_dir: &Path, name: &str) {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let configure = format!(
            "#!/bin/sh\n\
             for a in \"$@\"; do case \"$a\" in --prefix=*) prefix=\"${{a#--prefix=}}\";; esac; done\n\
             printf 'all:\\n\\ttouch built\\ninstall:\\n\\tmkdir -p %s/lib\\n\\tcp built %s/lib/lib{name}.so\\n' \
             \"$prefix\" \"$prefix\" > Makefile\n"
        );
        fs::create_dir_all(source_dir).unwrap();
        let file = fs::File::create(source_dir.join(format!("{name}-1.0.tar.gz"))).unwrap();
        let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(configure.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        tar.append_data(&mut header, format!("{name}-1.0/configure"), configure.as_bytes())
            .unwrap();
        tar.into_inner().unwrap().finish().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn builds_dependency_chain_into_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = builder(dir.path());
        b.create_directories().unwrap();
        write_fake_tarball(&dir.path().join("source"), "ogg");
        write_fake_tarball(&dir.path().join("source"), "vorbis");
        let ogg = Package::new("ogg", "https://example.com/ogg-1.0.tar.gz", "00");
        let vorbis = Package::new("vorbis", "https://example.com/vorbis-1.0.tar.gz", "00")
            .with_requires(&["ogg"]);

        b.build(&ogg, false).unwrap();
        assert!(b.is_built("ogg"));

        // a rebuild starts from a fresh source tree
        let stale = dir.path().join("build/ogg/stale");
        fs::write(&stale, b"left over").unwrap();
        b.build(&ogg, false).unwrap();
        assert!(!stale.exists());
        assert!(dir.path().join("build/ogg/Makefile").exists());

        b.build(&vorbis, false).unwrap();
        let dest = dir.path().join("dest");
        assert!(dest.join("lib/libogg.so").is_file());
        assert!(dest.join("lib/libvorbis.so").is_file());

        // no `where` on this host: the MinGW copy is skipped with a warning
        crate::postprocess::windows_postprocess(&dest).unwrap();
    }
}
