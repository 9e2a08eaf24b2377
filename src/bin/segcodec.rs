use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use segcodec::{
    compress_segment, decompress_segment, locate_segment, open_segment, CodecConfig, Compressor,
};

#[derive(Parser)]
#[command(name = "segcodec", version, about = "Compressed log-segment tooling")]
struct Cli {
    /// Gzip level used when writing (0-9, default fastest)
    #[arg(long, global = true, default_value_t = segcodec::config::DEFAULT_GZIP_LEVEL)]
    level: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the variant and bare path implied by a segment name
    Detect { path: PathBuf },
    /// Stream a segment's decoded bytes to stdout
    Cat {
        /// Stored path, or a bare path to resolve
        path: PathBuf,
    },
    /// Rewrite a bare segment into its compressed form
    Compress {
        bare: PathBuf,
        #[arg(long, default_value = "gzip")]
        compressor: Compressor,
    },
    /// Rewrite a compressed segment back to its bare path
    Decompress { path: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = CodecConfig::new().with_gzip_level(cli.level);

    match cli.command {
        Commands::Detect { path } => {
            let compressor = Compressor::detect_from_path(&path);
            let bare = compressor.strip_suffix_path(&path);
            println!("{compressor}\t{}", bare.display());
        }
        Commands::Cat { path } => {
            let stored = if path.exists() {
                path
            } else {
                locate_segment(&path)
                    .map(|(stored, _)| stored)
                    .ok_or_else(|| anyhow!("segment {} not found", path.display()))?
            };
            let mut segment = open_segment(&stored, config)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let copied = io::copy(&mut segment, &mut out);
            let closed = segment.close();
            copied.with_context(|| format!("read {}", stored.display()))?;
            closed?;
            out.flush()?;
        }
        Commands::Compress { bare, compressor } => {
            let size = compress_segment(&bare, compressor, config)?;
            println!("{}\t{size}", compressor.with_suffix_path(&bare).display());
        }
        Commands::Decompress { path } => {
            let size = decompress_segment(&path, config)?;
            let bare = Compressor::detect_from_path(&path).strip_suffix_path(&path);
            println!("{}\t{size}", bare.display());
        }
    }
    Ok(())
}
