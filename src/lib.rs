//! Transparent compression for log-segment files.
//!
//! Storage code names a segment by its bare path; the [`Compressor`] turns
//! that into the stored name (`000000042` → `000000042.gzip`) and wraps the
//! opened file in a [`TranscodingFile`], which compresses or decompresses
//! lazily on the first read or write.

mod codec;
pub mod compressor;
pub mod config;
pub mod error;
pub mod file;
pub mod segment;
pub mod transcode;

pub use compressor::Compressor;
pub use config::CodecConfig;
pub use error::{Error, Result};
pub use file::{DiskFile, SegmentFile};
pub use segment::{
    compress_segment, create_segment, decompress_segment, locate_segment, open_segment,
};
pub use transcode::{Direction, TranscodingFile};
