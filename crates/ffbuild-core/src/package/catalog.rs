//! Pinned source distributions for FFmpeg, its audio codecs and the build tools.

use super::{BuildSystem, Package};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};

/// Audio codec libraries FFmpeg can be linked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecId {
    Opus,
    Lame,
    Ogg,
    Vorbis,
    Speex,
    Twolame,
    OpencoreAmr,
    FdkAac,
}

impl CodecId {
    pub const ALL: [CodecId; 8] = [
        CodecId::Opus,
        CodecId::Lame,
        CodecId::Ogg,
        CodecId::Vorbis,
        CodecId::Speex,
        CodecId::Twolame,
        CodecId::OpencoreAmr,
        CodecId::FdkAac,
    ];

    /// FFmpeg `--enable-<lib>` names this codec provides. Ogg is a container
    /// library used by vorbis and has none of its own.
    pub fn ffmpeg_libraries(self) -> &'static [&'static str] {
        match self {
            CodecId::Opus => &["libopus"],
            CodecId::Lame => &["libmp3lame"],
            CodecId::Ogg => &[],
            CodecId::Vorbis => &["libvorbis"],
            CodecId::Speex => &["libspeex"],
            CodecId::Twolame => &["libtwolame"],
            CodecId::OpencoreAmr => &["libopencore-amrnb", "libopencore-amrwb"],
            CodecId::FdkAac => &["libfdk-aac"],
        }
    }

    pub fn package(self) -> Package {
        match self {
            CodecId::Opus => Package::new(
                "opus",
                "https://ftp.osuosl.org/pub/xiph/releases/opus/opus-1.6.tar.gz",
                "b7637334527201fdfd6dd6a02e67aceffb0e5e60155bbd89175647a80301c92c",
            )
            .with_arguments(["--disable-doc", "--disable-extra-programs"]),
            CodecId::Lame => Package::new(
                "lame",
                "https://download.sourceforge.net/lame/lame-3.100.tar.gz",
                "ddfe36cab873794038ae2c1210557ad34857a4b6bdc515785d1da9e175b1da1e",
            )
            .with_arguments(["--disable-decoder", "--disable-frontend", "--disable-gtktest"]),
            CodecId::Ogg => Package::new(
                "ogg",
                "https://ftp.osuosl.org/pub/xiph/releases/ogg/libogg-1.3.5.tar.gz",
                "0eb4b4b9420a0f51db142ba3f9c64b333f826532dc0f48c6410ae51f4799b664",
            ),
            CodecId::Vorbis => Package::new(
                "vorbis",
                "https://ftp.osuosl.org/pub/xiph/releases/vorbis/libvorbis-1.3.7.tar.gz",
                "0e982409a9c3fc82ee06e08205b1355e5c6aa4c36bca58146ef399621b0ce5ab",
            )
            .with_arguments(["--disable-docs", "--disable-examples", "--disable-oggtest"])
            .with_requires(&["ogg"]),
            CodecId::Speex => Package::new(
                "speex",
                "https://ftp.osuosl.org/pub/xiph/releases/speex/speex-1.2.1.tar.gz",
                "4b44d4f2b38a370a2d98a78329fefc56a0cf93d1c1be70029217baae6628feea",
            )
            .with_arguments(["--disable-binaries"]),
            CodecId::Twolame => Package::new(
                "twolame",
                "https://github.com/njh/twolame/releases/download/0.4.0/twolame-0.4.0.tar.gz",
                "cc35424f6019a88c6f52570b63e1baf50f62963a3eac52a03a800bb070d7c87d",
            )
            .with_arguments(["--disable-sndfile"]),
            CodecId::OpencoreAmr => Package::new(
                "opencore-amr",
                "https://download.sourceforge.net/opencore-amr/opencore-amr/opencore-amr-0.1.6.tar.gz",
                "483eb4061088e2b34b358e47540b5d495a96cd468e361050fae615b1809dc4a1",
            ),
            CodecId::FdkAac => Package::new(
                "fdk-aac",
                "https://download.sourceforge.net/opencore-amr/fdk-aac/fdk-aac-2.0.3.tar.gz",
                "829b6b89eef382409cda6857fd82af84fabb63417b08ede9ea7a553f811cb79e",
            )
            .with_build_system(BuildSystem::Cmake)
            .with_arguments(["-DBUILD_PROGRAMS=OFF"]),
        }
    }
}

/// gperf, needed by the build itself; installed into the tools prefix.
pub fn gperf_package() -> Package {
    Package::new(
        "gperf",
        "http://ftp.gnu.org/pub/gnu/gperf/gperf-3.1.tar.gz",
        "588546b945bba4b70b6a3a616e80b4ab466e3f33024a352fc2198112cdbb3ae2",
    )
}

/// FFmpeg itself, without configure flags (those come from the profile).
/// The Windows build is serial: parallel make races in the MinGW toolchain.
pub fn ffmpeg_package(platform: Platform) -> Package {
    Package::new(
        "ffmpeg",
        "https://ffmpeg.org/releases/ffmpeg-8.0.tar.xz",
        "b2751fccb6cc4c77708113cd78b561059b6fa904b24162fa0be2d60273d27b8e",
    )
    .with_build_parallel(platform != Platform::Windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn package_names_are_unique() {
        let mut names: HashSet<String> = CodecId::ALL.iter().map(|c| c.package().name).collect();
        assert_eq!(names.len(), CodecId::ALL.len());
        assert!(names.insert(gperf_package().name));
        assert!(names.insert(ffmpeg_package(Platform::Linux).name));
    }

    #[test]
    fn digests_are_sha256_hex() {
        let mut all: Vec<Package> = CodecId::ALL.iter().map(|c| c.package()).collect();
        all.push(gperf_package());
        all.push(ffmpeg_package(Platform::Linux));
        for p in all {
            assert_eq!(p.sha256.len(), 64, "{}", p.name);
            assert!(p.sha256.chars().all(|c| c.is_ascii_hexdigit()), "{}", p.name);
            assert!(p.tarball_name().is_ok(), "{}", p.name);
        }
    }

    #[test]
    fn vorbis_requires_ogg() {
        assert_eq!(CodecId::Vorbis.package().requires, vec!["ogg".to_string()]);
    }

    #[test]
    fn ffmpeg_serial_on_windows() {
        assert!(!ffmpeg_package(Platform::Windows).build_parallel);
        assert!(ffmpeg_package(Platform::Linux).build_parallel);
        assert!(ffmpeg_package(Platform::Darwin).build_parallel);
    }

    #[test]
    fn opencore_comes_from_upstream_release() {
        let p = CodecId::OpencoreAmr.package();
        assert!(p
            .source_url
            .starts_with("https://download.sourceforge.net/opencore-amr/opencore-amr/"));
        assert!(p.source_filename.is_none());
        assert_eq!(p.tarball_name().unwrap(), "opencore-amr-0.1.6.tar.gz");
    }
}
