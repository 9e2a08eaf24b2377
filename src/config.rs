//! Codec tuning for transcoding segment files.

use flate2::Compression;

/// Fastest gzip level. Segment writes are high-volume and append-only, so
/// throughput is favoured over ratio.
pub const DEFAULT_GZIP_LEVEL: u32 = 1;

/// Highest level accepted by the gzip encoder.
pub const MAX_GZIP_LEVEL: u32 = 9;

/// Buffer size used by the segment helpers when copying whole segments.
pub const DEFAULT_COPY_BUFFER: usize = 64 * 1024;

/// Codec settings applied when a `TranscodingFile` binds its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Gzip compression level (0-9).
    /// Default: 1 (fastest)
    pub gzip_level: u32,

    /// Buffer size for whole-segment copies.
    /// Default: 64 KiB
    pub copy_buffer: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            gzip_level: DEFAULT_GZIP_LEVEL,
            copy_buffer: DEFAULT_COPY_BUFFER,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level;
        self
    }

    pub fn with_copy_buffer(mut self, bytes: usize) -> Self {
        self.copy_buffer = bytes;
        self
    }

    /// Gzip level as a `flate2` setting, or a description of why it is invalid.
    pub(crate) fn gzip_compression(&self) -> Result<Compression, String> {
        if self.gzip_level > MAX_GZIP_LEVEL {
            return Err(format!(
                "gzip level {} out of range 0..={MAX_GZIP_LEVEL}",
                self.gzip_level
            ));
        }
        Ok(Compression::new(self.gzip_level))
    }
}
