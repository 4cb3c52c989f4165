//! IO abstractions: random-access byte reading and decompression.

mod byte_source;
mod decompress;

pub use byte_source::{ByteSource, FileSource, MemorySource};
pub use decompress::{
    COMPRESSION_SUFFIXES, Compression, Decompressor, StandardDecompressor,
    strip_compression_suffix,
};
