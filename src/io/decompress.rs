//! Opening possibly-compressed Info files.
//!
//! Installed manuals are usually gzip compressed (`make.info-1.gz`), so
//! every physical file goes through a [`Decompressor`] before the parser
//! sees it. Gzip is decoded in-process; the rarer formats are handed to
//! their command-line tools.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use log::debug;

use super::byte_source::{ByteSource, FileSource, MemorySource};

/// Turns a path into a random-access source of decompressed bytes.
pub trait Decompressor: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn ByteSource>>;
}

/// Compression formats found on installed Info files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Lzip,
    /// `compress(1)` (`.Z`) and `pack(1)` (`.z`) output.
    Compress,
}

/// File name suffixes tried when locating a manual, in lookup order.
pub const COMPRESSION_SUFFIXES: &[&str] = &[".gz", ".xz", ".bz2", ".lz", ".Z", ".z"];

impl Compression {
    /// Detect from the file name alone.
    pub fn from_suffix(name: &str) -> Compression {
        if name.ends_with(".gz") {
            Compression::Gzip
        } else if name.ends_with(".bz2") {
            Compression::Bzip2
        } else if name.ends_with(".xz") {
            Compression::Xz
        } else if name.ends_with(".lz") {
            Compression::Lzip
        } else if name.ends_with(".Z") || name.ends_with(".z") {
            Compression::Compress
        } else {
            Compression::None
        }
    }

    /// Detect from the first bytes of the file.
    pub fn from_magic(head: &[u8]) -> Compression {
        match head {
            [0x1f, 0x8b, ..] => Compression::Gzip,
            [b'B', b'Z', b'h', ..] => Compression::Bzip2,
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Compression::Xz,
            [b'L', b'Z', b'I', b'P', ..] => Compression::Lzip,
            [0x1f, 0x9d, ..] | [0x1f, 0x1e, ..] => Compression::Compress,
            _ => Compression::None,
        }
    }

    /// Program that decompresses stdin to stdout, for formats handled
    /// out of process.
    fn command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Compression::Bzip2 => Some(("bzip2", &["-dc"])),
            Compression::Xz => Some(("xz", &["-dc"])),
            Compression::Lzip => Some(("lzip", &["-dc"])),
            Compression::Compress => Some(("gzip", &["-dc"])),
            Compression::None | Compression::Gzip => None,
        }
    }
}

/// Remove a trailing compression suffix: `make.info-1.gz` -> `make.info-1`.
pub fn strip_compression_suffix(name: &str) -> &str {
    COMPRESSION_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// The default collaborator: gzip via `flate2`, other formats via external
/// programs, plain files served by positional reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecompressor;

impl Decompressor for StandardDecompressor {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn ByteSource>> {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let mut compression = Compression::from_suffix(&name);

        if compression == Compression::None {
            let mut head = [0u8; 6];
            let mut file = File::open(path)?;
            let read = read_prefix(&mut file, &mut head)?;
            compression = Compression::from_magic(&head[..read]);
        }

        debug!("opening {} as {compression:?}", path.display());
        match compression {
            Compression::None => Ok(Arc::new(FileSource::open(path)?)),
            Compression::Gzip => {
                let mut data = Vec::new();
                MultiGzDecoder::new(File::open(path)?).read_to_end(&mut data)?;
                Ok(Arc::new(MemorySource::new(data)))
            }
            other => Ok(Arc::new(MemorySource::new(run_filter(other, path)?))),
        }
    }
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn run_filter(compression: Compression, path: &Path) -> io::Result<Vec<u8>> {
    let Some((program, args)) = compression.command() else {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no decompressor for {compression:?}"),
        ));
    };

    let output = Command::new(program)
        .args(args)
        .stdin(File::open(path)?)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| io::Error::new(e.kind(), format!("running {program}: {e}")))?;

    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{program} failed on {}: {}", path.display(), output.status),
        ));
    }
    Ok(output.stdout)
}
