//! Segment-level helpers over the suffix convention.
//!
//! Storage code addresses segments by their bare path. These helpers pick
//! the stored name from the compressor, open the file, and hand back a
//! [`TranscodingFile`] so callers never deal with codec details.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::compressor::Compressor;
use crate::config::CodecConfig;
use crate::file::DiskFile;
use crate::transcode::TranscodingFile;

const TMP_SUFFIX: &str = ".tmp";

/// Create the stored form of `bare` for writing.
pub fn create_segment(
    bare: &Path,
    compressor: Compressor,
    config: CodecConfig,
) -> Result<TranscodingFile<DiskFile>> {
    let path = compressor.with_suffix_path(bare);
    let file = DiskFile::create(&path).with_context(|| format!("create {}", path.display()))?;
    Ok(compressor.wrap_with_config(file, config))
}

/// Open a stored segment for reading, choosing the codec from its suffix.
pub fn open_segment(path: &Path, config: CodecConfig) -> Result<TranscodingFile<DiskFile>> {
    let compressor = Compressor::detect_from_path(path);
    let file = DiskFile::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(compressor.wrap_with_config(file, config))
}

/// Find the stored form of a bare segment path.
///
/// The uncompressed file wins if both exist, since a compressed copy is
/// only authoritative once the bare file has been removed.
pub fn locate_segment(bare: &Path) -> Option<(PathBuf, Compressor)> {
    Compressor::ALL.into_iter().find_map(|compressor| {
        let path = compressor.with_suffix_path(bare);
        path.exists().then_some((path, compressor))
    })
}

/// Rewrite the bare segment at `bare` into its `compressor` form.
///
/// The bare file is only removed after the compressed copy has been fully
/// written, closed, verified and renamed into place.
///
/// # Returns
///
/// Size of the compressed file in bytes
pub fn compress_segment(bare: &Path, compressor: Compressor, config: CodecConfig) -> Result<u64> {
    if compressor == Compressor::None {
        return Err(anyhow!("refusing to compress {} with no codec", bare.display()));
    }
    let dest = compressor.with_suffix_path(bare);
    let size = rewrite(bare, Compressor::None, &dest, compressor, config)?;
    std::fs::remove_file(bare).with_context(|| format!("remove {}", bare.display()))?;
    log::info!(
        "compressed {} -> {} ({} bytes)",
        bare.display(),
        dest.display(),
        size
    );
    Ok(size)
}

/// Rewrite a compressed segment back to its bare path.
///
/// # Returns
///
/// Size of the decompressed file in bytes
pub fn decompress_segment(path: &Path, config: CodecConfig) -> Result<u64> {
    let compressor = Compressor::detect_from_path(path);
    if compressor == Compressor::None {
        return Err(anyhow!("{} has no compression suffix", path.display()));
    }
    let bare = compressor.strip_suffix_path(path);
    let size = rewrite(path, compressor, &bare, Compressor::None, config)?;
    std::fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    log::info!(
        "decompressed {} -> {} ({} bytes)",
        path.display(),
        bare.display(),
        size
    );
    Ok(size)
}

/// Copy every decoded byte of `src` into `dest` through a temporary file,
/// then rename it into place.
fn rewrite(
    src: &Path,
    src_compressor: Compressor,
    dest: &Path,
    dest_compressor: Compressor,
    config: CodecConfig,
) -> Result<u64> {
    let tmp = temp_path(dest);
    // Clean up any leftover tmp file
    let _ = std::fs::remove_file(&tmp);

    let result = copy_into(src, src_compressor, &tmp, dest_compressor, config)
        .and_then(|()| verify(&tmp, dest_compressor, config));
    if let Err(err) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }

    let size = std::fs::metadata(&tmp)?.len();
    std::fs::rename(&tmp, dest)
        .with_context(|| format!("rename {} -> {}", tmp.display(), dest.display()))?;
    Ok(size)
}

fn copy_into(
    src: &Path,
    src_compressor: Compressor,
    tmp: &Path,
    dest_compressor: Compressor,
    config: CodecConfig,
) -> Result<()> {
    let input = DiskFile::open(src).with_context(|| format!("open {}", src.display()))?;
    let output = DiskFile::create(tmp).with_context(|| format!("create {}", tmp.display()))?;
    let mut reader = src_compressor.wrap_with_config(input, config);
    let mut writer = dest_compressor.wrap_with_config(output, config);

    let copied = pump(&mut reader, &mut writer, config.copy_buffer);
    // Both files are closed regardless of how the copy went.
    let closed_writer = writer.close();
    let closed_reader = reader.close();
    copied.with_context(|| format!("copy {} -> {}", src.display(), tmp.display()))?;
    closed_writer.with_context(|| format!("close {}", tmp.display()))?;
    closed_reader.with_context(|| format!("close {}", src.display()))?;
    Ok(())
}

fn pump(
    reader: &mut TranscodingFile<DiskFile>,
    writer: &mut TranscodingFile<DiskFile>,
    buffer_size: usize,
) -> Result<()> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    // Bind the writer even for an empty source so a valid stream is produced.
    writer.try_write(&[])?;
    loop {
        let read = reader.try_read(&mut buf)?;
        if read == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..read])?;
    }
}

/// Decode the freshly written file end to end.
fn verify(path: &Path, compressor: Compressor, config: CodecConfig) -> Result<()> {
    let file = DiskFile::open(path).with_context(|| format!("verify open {}", path.display()))?;
    let mut reader = compressor.wrap_with_config(file, config);
    let drained = std::io::copy(&mut reader, &mut std::io::sink());
    let closed = reader.close();
    drained.with_context(|| format!("verify read {}", path.display()))?;
    closed?;
    Ok(())
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_bare(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn read_segment(path: &Path) -> Result<Vec<u8>> {
        let mut segment = open_segment(path, CodecConfig::default())?;
        let mut out = Vec::new();
        segment.read_to_end(&mut out)?;
        segment.close()?;
        Ok(out)
    }

    #[test]
    fn test_compress_segment_atomic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let payload = b"Hello, World! ".repeat(1000);
        let bare = write_bare(temp_dir.path(), "000000000", &payload);

        let size = compress_segment(&bare, Compressor::Gzip, CodecConfig::default())?;

        let stored = temp_dir.path().join("000000000.gzip");
        assert!(size > 0);
        assert!((size as usize) < payload.len());
        assert!(!bare.exists(), "bare file should be removed");
        assert!(stored.exists());
        assert!(!temp_dir.path().join("000000000.gzip.tmp").exists());
        assert_eq!(read_segment(&stored)?, payload);
        Ok(())
    }

    #[test]
    fn test_compress_segment_replaces_stale_tmp() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let bare = write_bare(temp_dir.path(), "000000001", b"Test");
        std::fs::write(temp_dir.path().join("000000001.gzip.tmp"), b"old")?;

        compress_segment(&bare, Compressor::Gzip, CodecConfig::default())?;

        assert!(!temp_dir.path().join("000000001.gzip.tmp").exists());
        assert_eq!(read_segment(&temp_dir.path().join("000000001.gzip"))?, b"Test");
        Ok(())
    }

    #[test]
    fn test_compress_rejects_identity() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let bare = write_bare(temp_dir.path(), "000000002", b"x");
        assert!(compress_segment(&bare, Compressor::None, CodecConfig::default()).is_err());
        assert!(bare.exists());
        Ok(())
    }

    #[test]
    fn test_decompress_segment() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let bare = write_bare(temp_dir.path(), "000000004", b"");
        compress_segment(&bare, Compressor::Gzip, CodecConfig::default())?;

        let stored = temp_dir.path().join("000000004.gzip");
        let size = decompress_segment(&stored, CodecConfig::default())?;
        assert_eq!(size, 0);
        assert!(bare.exists());
        assert!(!stored.exists());
        Ok(())
    }

    #[test]
    fn test_decompress_corrupt_keeps_source() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let stored = write_bare(temp_dir.path(), "000000005.gzip", b"not gzip at all");

        let err = decompress_segment(&stored, CodecConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("bad magic"), "{err:#}");
        assert!(stored.exists());
        assert!(!temp_dir.path().join("000000005").exists());
        assert!(!temp_dir.path().join("000000005.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_locate_prefers_bare() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let bare = temp_dir.path().join("000000006");
        assert_eq!(locate_segment(&bare), None);

        let mut segment = create_segment(&bare, Compressor::Gzip, CodecConfig::default())?;
        segment.write_all(b"cold")?;
        segment.close()?;
        assert_eq!(
            locate_segment(&bare),
            Some((temp_dir.path().join("000000006.gzip"), Compressor::Gzip))
        );

        std::fs::write(&bare, b"hot")?;
        assert_eq!(locate_segment(&bare), Some((bare.clone(), Compressor::None)));
        Ok(())
    }
}
