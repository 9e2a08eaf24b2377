//! Lazy, direction-bound transcoding over a segment file.
//!
//! A [`TranscodingFile`] starts unbound. The first `read` or `write` picks
//! the direction for the rest of its life and builds the matching codec
//! stream over the underlying file. Using the other direction afterwards
//! fails with [`Error::DirectionConflict`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use segcodec::{Compressor, DiskFile};
//!
//! let file = DiskFile::create(&Compressor::Gzip.with_suffix_path(bare))?;
//! let mut segment = Compressor::Gzip.wrap(file);
//! segment.write_all(b"record")?;
//! segment.close()?; // gzip trailer is flushed before the file is closed
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::mem;

use crate::codec::Stream;
use crate::compressor::Compressor;
use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::file::SegmentFile;

/// I/O direction a wrapper is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

enum State<F: SegmentFile> {
    Unbound(F),
    Bound(Direction, Stream<F>),
    /// Binding failed. Only `close` is meaningful.
    Failed(F),
    /// Codec already released and dropped; only the file may be closed again.
    Closed(F),
    /// Only observable if a panic interrupted a state transition.
    Vacant,
}

/// Segment file whose bytes are transparently (de)compressed.
pub struct TranscodingFile<F: SegmentFile> {
    compressor: Compressor,
    config: CodecConfig,
    state: State<F>,
}

impl<F: SegmentFile> TranscodingFile<F> {
    pub fn new(file: F, compressor: Compressor) -> Self {
        Self::with_config(file, compressor, CodecConfig::default())
    }

    pub fn with_config(file: F, compressor: Compressor, config: CodecConfig) -> Self {
        Self {
            compressor,
            config,
            state: State::Unbound(file),
        }
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Direction chosen by the first I/O call, if any.
    pub fn direction(&self) -> Option<Direction> {
        match &self.state {
            State::Bound(direction, _) => Some(*direction),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed(_))
    }

    /// The underlying file.
    pub fn get_ref(&self) -> Option<&F> {
        match &self.state {
            State::Unbound(file) | State::Failed(file) | State::Closed(file) => Some(file),
            State::Bound(_, stream) => Some(stream.underlying()),
            State::Vacant => None,
        }
    }

    /// Read decoded bytes, binding the read path on first use.
    pub fn try_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.bind(Direction::Read)?;
        Ok(stream.read(buf)?)
    }

    /// Write bytes to be encoded, binding the write path on first use.
    pub fn try_write(&mut self, buf: &[u8]) -> Result<usize> {
        let stream = self.bind(Direction::Write)?;
        Ok(stream.write(buf)?)
    }

    pub fn try_flush(&mut self) -> Result<()> {
        match &mut self.state {
            State::Bound(Direction::Write, stream) => Ok(stream.flush()?),
            State::Bound(Direction::Read, _) | State::Unbound(_) | State::Failed(_) => Ok(()),
            State::Closed(_) | State::Vacant => Err(Error::Closed),
        }
    }

    /// Release the codec, then the underlying file.
    ///
    /// Every step runs even if an earlier one fails; the first failure is
    /// returned. Calling `close` again only re-closes the underlying file.
    pub fn close(&mut self) -> Result<()> {
        let mut first = FirstError::new(self.compressor);
        let mut file = match mem::replace(&mut self.state, State::Vacant) {
            State::Unbound(file) | State::Failed(file) | State::Closed(file) => file,
            State::Bound(_, mut stream) => {
                first.record("codec", stream.finish());
                stream.into_file()
            }
            State::Vacant => return Err(Error::Closed),
        };
        first.record("file", file.close());
        self.state = State::Closed(file);
        first.into_result()
    }

    fn bind(&mut self, direction: Direction) -> Result<&mut Stream<F>> {
        if let State::Unbound(_) = self.state {
            if let State::Unbound(file) = mem::replace(&mut self.state, State::Vacant) {
                let bound = match direction {
                    Direction::Read => Stream::reader(self.compressor, file),
                    Direction::Write => Stream::writer(self.compressor, &self.config, file),
                };
                match bound {
                    Ok(stream) => {
                        log::debug!(
                            "bound {} {} stream for {}",
                            self.compressor,
                            direction,
                            stream.underlying().name()
                        );
                        self.state = State::Bound(direction, stream);
                    }
                    Err((file, err)) => {
                        log::warn!("failed to bind {direction} stream for {}: {err}", file.name());
                        self.state = State::Failed(file);
                        return Err(err);
                    }
                }
            }
        }

        match &mut self.state {
            State::Bound(bound, stream) => {
                if *bound != direction {
                    return Err(Error::DirectionConflict {
                        bound: *bound,
                        attempted: direction,
                    });
                }
                Ok(stream)
            }
            State::Failed(_) => Err(Error::BindFailed),
            State::Unbound(_) | State::Closed(_) | State::Vacant => Err(Error::Closed),
        }
    }
}

impl<F: SegmentFile> Read for TranscodingFile<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.try_read(buf).map_err(io::Error::from)
    }
}

impl<F: SegmentFile> Write for TranscodingFile<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.try_write(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.try_flush().map_err(io::Error::from)
    }
}

impl<F: SegmentFile> SegmentFile for TranscodingFile<F> {
    /// Name of the stored (suffixed) file.
    fn name(&self) -> String {
        let inner = self.get_ref().map(|file| file.name()).unwrap_or_default();
        self.compressor.with_suffix(&inner)
    }

    fn close(&mut self) -> io::Result<()> {
        TranscodingFile::close(self).map_err(io::Error::from)
    }
}

/// Keeps the first teardown failure; later ones are logged and dropped.
struct FirstError {
    compressor: Compressor,
    first: Option<io::Error>,
}

impl FirstError {
    fn new(compressor: Compressor) -> Self {
        Self {
            compressor,
            first: None,
        }
    }

    fn record(&mut self, step: &'static str, result: io::Result<()>) {
        let Err(err) = result else {
            return;
        };
        if self.first.is_none() {
            self.first = Some(err);
        } else {
            log::warn!("{} close: suppressed {step} error: {err}", self.compressor);
        }
    }

    fn into_result(self) -> Result<()> {
        match self.first {
            Some(err) => Err(Error::from(err)),
            None => Ok(()),
        }
    }
}
