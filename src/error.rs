use std::io;

use thiserror::Error;

use crate::compressor::Compressor;
use crate::transcode::Direction;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {compressor} stream: {reason}")]
    CodecInit {
        compressor: Compressor,
        reason: &'static str,
    },
    #[error("cannot start {compressor} writer: {reason}")]
    CodecWriteInit {
        compressor: Compressor,
        reason: String,
    },
    #[error("io error: {0}")]
    Io(#[source] io::Error),
    #[error("segment file bound for {bound}, cannot {attempted}")]
    DirectionConflict {
        bound: Direction,
        attempted: Direction,
    },
    #[error("segment file unusable after failed codec binding")]
    BindFailed,
    #[error("segment file closed")]
    Closed,
}

impl Error {
    /// Recover a typed error carried inside an `io::Error`, if any.
    pub fn from_io_ref(err: &io::Error) -> Option<&Error> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Error>())
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Error::CodecInit { .. } => io::ErrorKind::InvalidData,
            Error::CodecWriteInit { .. } => io::ErrorKind::InvalidInput,
            Error::Io(err) => err.kind(),
            Error::DirectionConflict { .. } => io::ErrorKind::Unsupported,
            Error::BindFailed | Error::Closed => io::ErrorKind::Other,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        if Error::from_io_ref(&value).is_none() {
            return Error::Io(value);
        }
        match value.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(err)) => *err,
            Some(Err(other)) => Error::Io(io::Error::new(io::ErrorKind::Other, other)),
            None => Error::Io(io::Error::new(io::ErrorKind::Other, "empty io error")),
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(err) => err,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_pass_through_unchanged() {
        let original = io::Error::new(io::ErrorKind::BrokenPipe, "pipe gone");
        let err = Error::from(original);
        assert!(matches!(&err, Error::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
        assert!(Error::from_io_ref(&back).is_none());
    }

    #[test]
    fn typed_errors_survive_io_conversion() {
        let io_err: io::Error = Error::CodecInit {
            compressor: Compressor::Gzip,
            reason: "bad magic",
        }
        .into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            Error::from_io_ref(&io_err),
            Some(Error::CodecInit { .. })
        ));

        match Error::from(io_err) {
            Error::CodecInit { compressor, reason } => {
                assert_eq!(compressor, Compressor::Gzip);
                assert_eq!(reason, "bad magic");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn display_names_the_variant() {
        let err = Error::DirectionConflict {
            bound: Direction::Read,
            attempted: Direction::Write,
        };
        assert_eq!(err.to_string(), "segment file bound for read, cannot write");
    }
}
