//! Build profiles: which codecs go into the bundle and how FFmpeg is configured.

use super::catalog::{ffmpeg_package, CodecId};
use super::Package;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Features and backends never wanted in the bundle, regardless of profile.
const ALWAYS_DISABLED: &[&str] = &[
    "programs",
    "doc",
    "libxml2",
    "lzma",
    "libtheora",
    "libfreetype",
    "libfontconfig",
    "libbluray",
    "libopenjpeg",
    "mediafoundation",
    // no nasm on the runners
    "x86asm",
    "alsa",
    "gnutls",
    "libxcb",
    "sdl2",
    "vulkan",
    "cuda",
    "cuvid",
    "nvenc",
    "nvdec",
    "amf",
    "audiotoolbox",
    "videotoolbox",
    "libaom",
    "libdav1d",
];

/// Optional external libraries, disabled unless the profile builds them.
/// The video ones are never built.
const OPTIONAL_LIBRARIES: &[&str] = &[
    "libmp3lame",
    "libopencore-amrnb",
    "libopencore-amrwb",
    "libspeex",
    "libsvtav1",
    "libtwolame",
    "libvorbis",
    "libvpx",
    "libwebp",
    "libopenh264",
    "libx264",
    "libx265",
];

/// Codec selection and FFmpeg configuration for one bundle flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Opus only.
    #[default]
    Minimal,
    /// All redistributable audio codecs.
    Audio,
    /// `Audio` plus fdk-aac; the result is non-free.
    Full,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile {0:?} (expected minimal, audio or full)")]
pub struct ParseProfileError(String);

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Minimal, Profile::Audio, Profile::Full];

    /// Codecs built before FFmpeg, in build order (dependencies first).
    pub fn codecs(self) -> &'static [CodecId] {
        match self {
            Profile::Minimal => &[CodecId::Opus],
            Profile::Audio => &[
                CodecId::Opus,
                CodecId::Lame,
                CodecId::Ogg,
                CodecId::Vorbis,
                CodecId::Speex,
                CodecId::Twolame,
                CodecId::OpencoreAmr,
            ],
            Profile::Full => &[
                CodecId::Opus,
                CodecId::Lame,
                CodecId::Ogg,
                CodecId::Vorbis,
                CodecId::Speex,
                CodecId::Twolame,
                CodecId::OpencoreAmr,
                CodecId::FdkAac,
            ],
        }
    }

    fn enabled_libraries(self) -> Vec<&'static str> {
        self.codecs()
            .iter()
            .flat_map(|c| c.ffmpeg_libraries().iter().copied())
            .collect()
    }

    /// FFmpeg configure arguments for this profile.
    pub fn ffmpeg_arguments(self) -> Vec<String> {
        let enabled = self.enabled_libraries();
        let mut args: Vec<String> = ALWAYS_DISABLED
            .iter()
            .map(|f| format!("--disable-{f}"))
            .collect();
        args.extend(
            OPTIONAL_LIBRARIES
                .iter()
                .filter(|lib| !enabled.contains(lib))
                .map(|lib| format!("--disable-{lib}")),
        );

        args.push("--enable-version3".to_string());
        args.push("--enable-zlib".to_string());
        args.extend(enabled.iter().map(|lib| format!("--enable-{lib}")));
        if self == Profile::Full {
            args.push("--enable-nonfree".to_string());
        }
        args
    }

    /// Codec packages followed by a configured FFmpeg package.
    pub fn packages(self, platform: Platform) -> Vec<Package> {
        let mut packages: Vec<Package> = self.codecs().iter().map(|c| c.package()).collect();
        let mut ffmpeg = ffmpeg_package(platform);
        ffmpeg.build_arguments = self.ffmpeg_arguments();
        packages.push(ffmpeg);
        packages
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Minimal => "minimal",
            Profile::Audio => "audio",
            Profile::Full => "full",
        })
    }
}

impl FromStr for Profile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Profile::Minimal),
            "audio" => Ok(Profile::Audio),
            "full" => Ok(Profile::Full),
            _ => Err(ParseProfileError(s.to_string())),
        }
    }
}
