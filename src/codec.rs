//! Codec streams bound over a segment file.

use std::io::{self, Chain, Cursor, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::compressor::Compressor;
use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::file::SegmentFile;

const GZIP_HEADER_LEN: usize = 10;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_METHOD_DEFLATE: u8 = 8;

/// Underlying file with the already-validated header bytes replayed in front.
type Replayed<F> = Chain<Cursor<Vec<u8>>, F>;

/// Binding outcome; on failure the file is handed back so it can be closed.
pub(crate) type Binding<F> = std::result::Result<Stream<F>, (F, Error)>;

/// A bound read or write path over the underlying file.
pub(crate) enum Stream<F: SegmentFile> {
    Plain(F),
    /// Gzip reader over a zero-length file: end of stream from the start.
    Empty(F),
    Inflate(Box<MultiGzDecoder<Replayed<F>>>),
    /// Compressed output collects in the encoder's buffer and is drained
    /// into `file` after every call, so the file never sits inside the codec.
    Deflate {
        encoder: Box<GzEncoder<Vec<u8>>>,
        file: F,
    },
}

impl<F: SegmentFile> Stream<F> {
    pub(crate) fn reader(compressor: Compressor, mut file: F) -> Binding<F> {
        match compressor {
            Compressor::None => Ok(Stream::Plain(file)),
            Compressor::Gzip => match read_gzip_header(&mut file) {
                Ok(Some(header)) => {
                    let replayed = Cursor::new(header).chain(file);
                    Ok(Stream::Inflate(Box::new(MultiGzDecoder::new(replayed))))
                }
                Ok(None) => Ok(Stream::Empty(file)),
                Err(err) => Err((file, err)),
            },
        }
    }

    pub(crate) fn writer(compressor: Compressor, config: &CodecConfig, file: F) -> Binding<F> {
        match compressor {
            Compressor::None => Ok(Stream::Plain(file)),
            Compressor::Gzip => match config.gzip_compression() {
                Ok(level) => Ok(Stream::Deflate {
                    encoder: Box::new(GzEncoder::new(Vec::new(), level)),
                    file,
                }),
                Err(reason) => Err((
                    file,
                    Error::CodecWriteInit {
                        compressor,
                        reason,
                    },
                )),
            },
        }
    }

    pub(crate) fn underlying(&self) -> &F {
        match self {
            Stream::Plain(file) | Stream::Empty(file) | Stream::Deflate { file, .. } => file,
            Stream::Inflate(decoder) => decoder.get_ref().get_ref().1,
        }
    }

    /// Close the codec layer. For an encoder this writes the remaining
    /// compressed data and the gzip trailer into the underlying file.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(_) | Stream::Empty(_) | Stream::Inflate(_) => Ok(()),
            Stream::Deflate { encoder, file } => {
                encoder.try_finish()?;
                drain(encoder, file)
            }
        }
    }

    /// Drop the codec and hand back the underlying file.
    pub(crate) fn into_file(self) -> F {
        match self {
            Stream::Plain(file) | Stream::Empty(file) | Stream::Deflate { file, .. } => file,
            Stream::Inflate(decoder) => decoder.into_inner().into_inner().1,
        }
    }
}

/// Move pending compressed bytes into the file. The buffer is cleared even
/// on failure so a broken stream never replays output.
fn drain<F: Write>(encoder: &mut GzEncoder<Vec<u8>>, file: &mut F) -> io::Result<()> {
    let pending = encoder.get_mut();
    if pending.is_empty() {
        return Ok(());
    }
    let result = file.write_all(pending);
    pending.clear();
    result
}

impl<F: SegmentFile> Read for Stream<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(file) => file.read(buf),
            Stream::Empty(_) => Ok(0),
            Stream::Inflate(decoder) => decoder.read(buf),
            Stream::Deflate { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "read from a compressing stream",
            )),
        }
    }
}

impl<F: SegmentFile> Write for Stream<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(file) => file.write(buf),
            Stream::Deflate { encoder, file } => {
                let written = encoder.write(buf)?;
                drain(encoder, file)?;
                Ok(written)
            }
            Stream::Empty(_) | Stream::Inflate(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "write to a decompressing stream",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(file) | Stream::Empty(file) => file.flush(),
            Stream::Deflate { encoder, file } => {
                encoder.flush()?;
                drain(encoder, file)?;
                file.flush()
            }
            Stream::Inflate(decoder) => decoder.get_mut().get_mut().1.flush(),
        }
    }
}

/// Read and validate the fixed part of a gzip member header.
///
/// A zero-length stream yields `None` and reads as empty. A short header
/// is rejected: a reader is never bound over bytes that cannot start a
/// gzip member.
fn read_gzip_header<R: Read>(src: &mut R) -> Result<Option<Vec<u8>>> {
    let mut header = vec![0u8; GZIP_HEADER_LEN];
    let mut filled = 0;
    while filled < GZIP_HEADER_LEN {
        match src.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::Io(err)),
        }
    }
    let invalid = |reason| Error::CodecInit {
        compressor: Compressor::Gzip,
        reason,
    };
    if filled == 0 {
        return Ok(None);
    }
    if filled < GZIP_HEADER_LEN {
        return Err(invalid("truncated header"));
    }
    if header[..2] != GZIP_MAGIC {
        return Err(invalid("bad magic"));
    }
    if header[2] != GZIP_METHOD_DEFLATE {
        return Err(invalid("unsupported compression method"));
    }
    Ok(Some(header))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_check_accepts_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(b"payload").unwrap();
        let bytes = encoder.finish().unwrap();

        let mut src = Cursor::new(bytes.clone());
        let header = read_gzip_header(&mut src).unwrap().expect("header");
        assert_eq!(header, bytes[..GZIP_HEADER_LEN]);
        assert_eq!(src.position(), GZIP_HEADER_LEN as u64);
    }

    #[test]
    fn header_check_rejects_garbage() {
        let cases: [(&[u8], &str); 3] = [
            (&b"\x1f\x8b\x08"[..], "truncated header"),
            (&b"plain text segment"[..], "bad magic"),
            (&[0x1f, 0x8b, 0x07, 0, 0, 0, 0, 0, 0, 0xff][..], "unsupported compression method"),
        ];
        for (bytes, expected) in cases {
            match read_gzip_header(&mut Cursor::new(bytes)) {
                Err(Error::CodecInit { reason, .. }) => assert_eq!(reason, expected),
                other => panic!("unexpected result for {bytes:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn header_check_treats_zero_length_as_empty() {
        assert!(read_gzip_header(&mut Cursor::new(Vec::new())).unwrap().is_none());
    }
}
