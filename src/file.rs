use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// File-like resource a segment is stored in.
///
/// `close` releases the resource; later calls are allowed and report
/// whatever the resource's own double-close behaviour is.
pub trait SegmentFile: Read + Write {
    fn name(&self) -> String;

    fn close(&mut self) -> io::Result<()>;
}

impl<T: SegmentFile + ?Sized> SegmentFile for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Segment file on the local filesystem.
pub struct DiskFile {
    path: PathBuf,
    file: Option<File>,
    writable: bool,
}

impl DiskFile {
    /// Open an existing file read-only.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            writable: false,
        })
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            writable: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.handle()?.metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    fn handle(&self) -> io::Result<&File> {
        self.file.as_ref().ok_or_else(already_closed)
    }

    fn handle_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(already_closed)
    }
}

fn already_closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "file already closed")
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle_mut()?.read(buf)
    }
}

impl Write for DiskFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle_mut()?.flush()
    }
}

impl SegmentFile for DiskFile {
    fn name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn close(&mut self) -> io::Result<()> {
        let mut file = self.file.take().ok_or_else(already_closed)?;
        if self.writable {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}
