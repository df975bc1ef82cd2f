//! `build-ffmpeg list` – show what a profile would fetch and build.

use anyhow::Result;
use ffbuild_core::package::{Package, Profile};
use ffbuild_core::pipeline;
use ffbuild_core::platform::Platform;

fn render(packages: &[Package]) -> String {
    let mut out = String::new();
    for p in packages {
        out.push_str(&format!("{}  {}\n", p.name, p.source_url));
        out.push_str(&format!("    sha256 {}\n", p.sha256));
        if !p.requires.is_empty() {
            out.push_str(&format!("    requires {}\n", p.requires.join(", ")));
        }
        for arg in &p.build_arguments {
            out.push_str(&format!("    {}\n", arg));
        }
    }
    out
}

pub fn run_list(profile: Profile, json: bool) -> Result<()> {
    let platform = Platform::current()?;
    let packages = pipeline::all_packages(profile, platform);
    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        print!("{}", render(&packages));
    }
    Ok(())
}
