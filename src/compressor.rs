//! Compression variants and the filename suffix convention.
//!
//! A segment's stored name is its bare path plus the variant's canonical
//! suffix. Detection is purely suffix-based; file contents are never sniffed.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::CodecConfig;
use crate::file::SegmentFile;
use crate::transcode::TranscodingFile;

const GZIP_SUFFIX: &str = ".gzip";

/// Compression scheme applied to a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Compressor {
    /// Identity: bytes are stored as written.
    #[default]
    None,
    /// Streaming gzip (deflate), stored under a `.gzip` suffix.
    Gzip,
}

impl Compressor {
    /// Every known variant, in detection order.
    pub const ALL: [Compressor; 2] = [Compressor::None, Compressor::Gzip];

    /// Canonical filename suffix (`""` for `None`).
    pub fn extension(self) -> &'static str {
        match self {
            Compressor::None => "",
            Compressor::Gzip => GZIP_SUFFIX,
        }
    }

    /// Lowercase name used by `Display`, `FromStr` and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Compressor::None => "none",
            Compressor::Gzip => "gzip",
        }
    }

    /// Remove this variant's suffix from `path`.
    ///
    /// Repeated trailing suffixes are all removed, so the result never ends
    /// in the suffix and applying this twice equals applying it once.
    pub fn strip_suffix(self, path: &str) -> String {
        let ext = self.extension();
        if ext.is_empty() {
            return path.to_string();
        }
        let mut bare = path;
        while let Some(rest) = bare.strip_suffix(ext) {
            bare = rest;
        }
        bare.to_string()
    }

    /// Append this variant's suffix to `path` unless it is already there.
    pub fn with_suffix(self, path: &str) -> String {
        let ext = self.extension();
        if ext.is_empty() || path.ends_with(ext) {
            return path.to_string();
        }
        format!("{path}{ext}")
    }

    /// Variant whose suffix ends `path`, or `None` when no known suffix matches.
    pub fn detect_from(path: &str) -> Compressor {
        Self::ALL
            .into_iter()
            .find(|c| !c.extension().is_empty() && path.ends_with(c.extension()))
            .unwrap_or(Compressor::None)
    }

    /// Path form of [`Compressor::with_suffix`].
    pub fn with_suffix_path(self, path: &Path) -> PathBuf {
        if self.has_suffix_path(path) || self.extension().is_empty() {
            return path.to_path_buf();
        }
        let mut name = OsString::from(path.as_os_str());
        name.push(self.extension());
        PathBuf::from(name)
    }

    /// Path form of [`Compressor::strip_suffix`]. Non-UTF-8 paths never
    /// carry a known suffix and are returned unchanged.
    pub fn strip_suffix_path(self, path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(self.strip_suffix(s)),
            None => path.to_path_buf(),
        }
    }

    /// Path form of [`Compressor::detect_from`].
    pub fn detect_from_path(path: &Path) -> Compressor {
        path.to_str()
            .map(Compressor::detect_from)
            .unwrap_or(Compressor::None)
    }

    fn has_suffix_path(self, path: &Path) -> bool {
        path.to_str()
            .map(|s| s.ends_with(self.extension()))
            .unwrap_or(false)
    }

    /// Wrap `file` so reads and writes are transcoded by this variant.
    pub fn wrap<F: SegmentFile>(self, file: F) -> TranscodingFile<F> {
        TranscodingFile::new(file, self)
    }

    pub fn wrap_with_config<F: SegmentFile>(
        self,
        file: F,
        config: CodecConfig,
    ) -> TranscodingFile<F> {
        TranscodingFile::with_config(file, self, config)
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compressor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compressor::None),
            "gzip" | "gz" => Ok(Compressor::Gzip),
            other => Err(format!("unknown compressor: {other}")),
        }
    }
}
