//! artifact emission.
//!
//! an artifact is the compressed header section (the sealed document
//! bytes) followed by uncompressed data blocks. the compression adapter
//! wraps only the header: it is small and highly structured, while file
//! content may already be compressed upstream. everything goes through
//! one output stream, and only `finish` surfaces buffered write errors,
//! so callers must check it rather than the individual writes.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};

/// artifact magic preceding the compression tag and header section
pub const ARTIFACT_MAGIC: [u8; 4] = *b"brlp";

/// fixed header preceding each data block's raw bytes
pub const BLOCK_HEADER_LEN: usize = 8;

/// compression applied to the header section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd { level: i32 },
}

impl Compression {
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Zstd { .. } => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Zstd { level: 0 }),
            other => Err(Error::UnknownCompression(other)),
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        // level 0 selects zstd's own default
        Compression::Zstd { level: 0 }
    }
}

/// streams one artifact: header section first, then data blocks
pub struct ArtifactWriter<W: Write> {
    out: W,
    /// artifact destination, for error tagging
    path: PathBuf,
}

impl<W: Write> ArtifactWriter<W> {
    pub fn new(out: W, path: impl Into<PathBuf>) -> Self {
        Self {
            out,
            path: path.into(),
        }
    }

    /// write magic, compression tag, and the wrapped header section
    pub fn write_header(&mut self, document: &[u8], compression: Compression) -> Result<()> {
        let wrapped = match compression {
            Compression::None => document.to_vec(),
            Compression::Zstd { level } => {
                zstd::encode_all(document, level).with_path(&self.path)?
            }
        };
        self.out.write_all(&ARTIFACT_MAGIC).with_path(&self.path)?;
        self.out
            .write_all(&[compression.tag()])
            .with_path(&self.path)?;
        self.out
            .write_all(&(wrapped.len() as u32).to_le_bytes())
            .with_path(&self.path)?;
        self.out.write_all(&wrapped).with_path(&self.path)?;
        Ok(())
    }

    /// write one data block: `{path_idx, file_idx}` then exactly `size`
    /// bytes streamed from `reader`. a short source is an error tagged
    /// with the source path.
    pub fn write_block<R: Read>(
        &mut self,
        path_idx: u32,
        file_idx: u32,
        size: u64,
        source: &Path,
        reader: R,
    ) -> Result<()> {
        self.out
            .write_all(&path_idx.to_le_bytes())
            .with_path(&self.path)?;
        self.out
            .write_all(&file_idx.to_le_bytes())
            .with_path(&self.path)?;

        let mut limited = reader.take(size);
        let mut buf = [0u8; 64 * 1024];
        let mut copied = 0u64;
        loop {
            let n = limited.read(&mut buf).with_path(source)?;
            if n == 0 {
                break;
            }
            self.out.write_all(&buf[..n]).with_path(&self.path)?;
            copied += n as u64;
        }
        if copied != size {
            return Err(Error::Io {
                path: source.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file shrank during packaging: read {copied} of {size} bytes"),
                ),
            });
        }
        Ok(())
    }

    /// flush and hand the stream back; this is where buffered errors
    /// finally surface
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().with_path(&self.path)?;
        Ok(self.out)
    }
}
