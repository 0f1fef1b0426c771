//! artifact consumption.
//!
//! a `PackageReader` parses the header section eagerly, rebuilds the
//! hardlink side table, and then streams the uncompressed data blocks
//! one at a time in the order the header promises them.

use std::io::{Read, Write};

use log::debug;

use crate::digest::Digest;
use crate::document::{ArrayReader, Document, ObjectReader};
use crate::emit::{Compression, ARTIFACT_MAGIC, BLOCK_HEADER_LEN};
use crate::error::{Error, IoResultExt, Result};
use crate::hardlink::TargetTable;
use crate::schema::{
    DI_FILES, DI_NAME, FI_HASHES, FI_NAME, FI_SIZE, FI_TARGET, PI_HASHES, PKG_PATHS, PKG_PKGINFO,
    PKG_SCRIPTS, PKG_TRIGGERS, SCHEMA_PACKAGE,
};
use crate::value::Value;

/// decides whether a decompressed header section may be parsed.
///
/// verification runs on the raw document bytes before any field is
/// decoded, so an untrusted artifact is rejected while the attack
/// surface is still a single buffer compare.
pub trait Trust {
    fn verify(&self, document: &[u8]) -> Result<()>;
}

/// accepts every artifact; integrity can still be checked afterwards
/// via [`PackageReader::verify_id`]
pub struct NoTrust;

impl Trust for NoTrust {
    fn verify(&self, _document: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// requires the embedded package id to match a known-good id
pub struct ExpectedId(pub [u8; crate::digest::PACKAGE_ID_LEN]);

impl Trust for ExpectedId {
    fn verify(&self, document: &[u8]) -> Result<()> {
        // the id was computed over the document with its id region
        // zeroed, so zeroing and rehashing reproduces it
        if digest_of_zeroed_id(document)?.package_id() == self.0 {
            Ok(())
        } else {
            Err(Error::Verify(format!(
                "package id mismatch, wanted {}",
                hex::encode(self.0)
            )))
        }
    }
}

/// one promised data block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub path_idx: u32,
    pub file_idx: u32,
    pub size: u64,
}

/// reads one artifact: parsed header up front, data blocks on demand
pub struct PackageReader<R> {
    input: R,
    doc: Document,
    /// length of the document as stored; the fixup pass appends
    /// reader-local blobs past this point
    sealed_len: usize,
    table: TargetTable,
    blocks: Vec<BlockInfo>,
    cursor: usize,
}

impl<R: Read> PackageReader<R> {
    /// parse the artifact prefix and header section from `input`,
    /// leaving the stream positioned at the first data block
    pub fn open(mut input: R, trust: &dyn Trust) -> Result<Self> {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic).with_path("<artifact>")?;
        if magic != ARTIFACT_MAGIC {
            return Err(Error::BadArtifactMagic);
        }
        let mut tag = [0u8; 1];
        input.read_exact(&mut tag).with_path("<artifact>")?;
        let compression = Compression::from_tag(tag[0])?;
        let mut len = [0u8; 4];
        input.read_exact(&mut len).with_path("<artifact>")?;
        let stored_len = u32::from_le_bytes(len) as usize;

        let mut stored = vec![0u8; stored_len];
        input.read_exact(&mut stored).with_path("<artifact>")?;
        let header = match compression {
            Compression::None => stored,
            Compression::Zstd { .. } => {
                zstd::decode_all(&stored[..]).with_path("<artifact>")?
            }
        };
        debug!("header section: {} bytes stored, {} parsed", stored_len, header.len());

        trust.verify(&header)?;
        let sealed_len = header.len();
        let mut doc = Document::from_bytes(header)?;
        let table = TargetTable::build(&mut doc)?;
        let blocks = expected_blocks(&doc, &table)?;
        Ok(Self {
            input,
            doc,
            sealed_len,
            table,
            blocks,
            cursor: 0,
        })
    }

    fn pkg(&self) -> Result<ObjectReader<'_>> {
        ObjectReader::root(&self.doc, &SCHEMA_PACKAGE)
    }

    /// pkginfo cursor; a sealed package always carries one
    pub fn pkginfo(&self) -> Result<ObjectReader<'_>> {
        self.pkg()?
            .get_obj(PKG_PKGINFO)?
            .ok_or(Error::MissingField("pkginfo"))
    }

    /// the embedded package id bytes
    pub fn package_id(&self) -> Result<&[u8]> {
        self.pkginfo()?
            .get_blob(PI_HASHES)?
            .ok_or(Error::MissingField("hashes"))
    }

    /// recompute the digest with the id region zeroed and compare it
    /// against the embedded id
    pub fn verify_id(&self) -> Result<bool> {
        let digest = digest_of_zeroed_id(&self.doc.as_bytes()[..self.sealed_len])?;
        Ok(self.package_id()? == digest.package_id())
    }

    fn paths(&self) -> Result<Option<ArrayReader<'_>>> {
        self.pkg()?.get_arr(PKG_PATHS)
    }

    /// directory names in tree order
    pub fn dir_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if let Some(paths) = self.paths()? {
            for i in 1..=paths.len() {
                let dir = paths.obj(i)?;
                let name = dir.get_blob(DI_NAME)?.unwrap_or(b"");
                names.push(String::from_utf8_lossy(name).into_owned());
            }
        }
        Ok(names)
    }

    fn file(&self, path_idx: usize, file_idx: usize) -> Result<ObjectReader<'_>> {
        let paths = self.paths()?.ok_or(Error::MissingField("paths"))?;
        let files = paths
            .obj(path_idx)?
            .get_arr(DI_FILES)?
            .ok_or(Error::MissingField("files"))?;
        files.obj(file_idx)
    }

    /// file record names within one directory record (1-based index)
    pub fn file_names(&self, path_idx: usize) -> Result<Vec<String>> {
        let paths = self.paths()?.ok_or(Error::MissingField("paths"))?;
        let mut names = Vec::new();
        if let Some(files) = paths.obj(path_idx)?.get_arr(DI_FILES)? {
            for j in 1..=files.len() {
                let name = files.obj(j)?.get_blob(FI_NAME)?.unwrap_or(b"");
                names.push(String::from_utf8_lossy(name).into_owned());
            }
        }
        Ok(names)
    }

    /// content digest of one file record; later hardlinks carry none
    pub fn file_digest(&self, path_idx: usize, file_idx: usize) -> Result<Option<&[u8]>> {
        self.file(path_idx, file_idx)?.get_blob(FI_HASHES)
    }

    /// presented target of one file record. `None` means the record
    /// owns its content (regular file or canonical hardlink); `Some`
    /// carries the `{type bits, detail}` descriptor.
    pub fn file_target(&self, path_idx: usize, file_idx: usize) -> Result<Option<&[u8]>> {
        let raw = self.file(path_idx, file_idx)?.get(FI_TARGET)?;
        let presented = self
            .table
            .present(raw, path_idx as u32, file_idx as u32)?;
        match presented {
            Value::Null => Ok(None),
            v @ Value::Blob { .. } => Ok(Some(self.doc.blob_bytes(v)?)),
            other => Err(Error::KindMismatch {
                want: "blob",
                got: other.kind_name(),
            }),
        }
    }

    /// one script body by its slot index, None when absent
    pub fn script(&self, index: usize) -> Result<Option<Vec<u8>>> {
        match self.pkg()?.get_obj(PKG_SCRIPTS)? {
            Some(scripts) => Ok(scripts.get_blob(index)?.map(|b| b.to_vec())),
            None => Ok(None),
        }
    }

    /// trigger path patterns, empty when absent
    pub fn triggers(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if let Some(arr) = self.pkg()?.get_arr(PKG_TRIGGERS)? {
            for i in 1..=arr.len() {
                out.push(String::from_utf8_lossy(arr.blob(i)?).into_owned());
            }
        }
        Ok(out)
    }

    /// the data blocks the header promises, in stream order
    pub fn expected_blocks(&self) -> &[BlockInfo] {
        &self.blocks
    }

    /// read the next data block into `sink`, verifying its header
    /// against the promised order. returns None after the last block.
    pub fn next_block<W: Write>(&mut self, sink: &mut W) -> Result<Option<BlockInfo>> {
        let expect = match self.blocks.get(self.cursor) {
            Some(b) => *b,
            None => return Ok(None),
        };
        let mut header = [0u8; BLOCK_HEADER_LEN];
        self.input.read_exact(&mut header).with_path("<artifact>")?;
        let path_idx = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let file_idx = u32::from_le_bytes(header[4..8].try_into().unwrap());
        if (path_idx, file_idx) != (expect.path_idx, expect.file_idx) {
            return Err(Error::BlockOutOfOrder(
                expect.path_idx,
                expect.file_idx,
                path_idx,
                file_idx,
            ));
        }
        let copied = std::io::copy(&mut (&mut self.input).take(expect.size), sink)
            .with_path("<artifact>")?;
        if copied != expect.size {
            return Err(Error::Io {
                path: "<artifact>".into(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("data block short: {copied} of {} bytes", expect.size),
                ),
            });
        }
        self.cursor += 1;
        Ok(Some(expect))
    }
}

/// digest of the document with its embedded id region zeroed, which is
/// the state the bytes were in when the id was computed
fn digest_of_zeroed_id(document: &[u8]) -> Result<Digest> {
    let doc = Document::from_bytes(document.to_vec())?;
    let pkg = ObjectReader::root(&doc, &SCHEMA_PACKAGE)?;
    let pkgi = pkg
        .get_obj(PKG_PKGINFO)?
        .ok_or(Error::MissingField("pkginfo"))?;
    let id = match pkgi.get(PI_HASHES)? {
        v @ Value::Blob { .. } => v,
        _ => return Err(Error::MissingField("hashes")),
    };
    let mut copy = document.to_vec();
    if let Value::Blob { offset, len } = id {
        let start = offset as usize;
        let end = start + len as usize;
        if end > copy.len() {
            return Err(Error::Truncated {
                offset,
                need: len as usize,
                have: copy.len() - start,
            });
        }
        copy[start..end].fill(0);
    }
    Ok(Digest::of(&copy))
}

/// scan the paths tree in order and list every record that owns a data
/// block: presented target Null and a non-zero size
fn expected_blocks(doc: &Document, table: &TargetTable) -> Result<Vec<BlockInfo>> {
    let mut blocks = Vec::new();
    let pkg = ObjectReader::root(doc, &SCHEMA_PACKAGE)?;
    let paths = match pkg.get_arr(PKG_PATHS)? {
        Some(paths) => paths,
        None => return Ok(blocks),
    };
    for i in 1..=paths.len() {
        let dir = paths.obj(i)?;
        let files = match dir.get_arr(DI_FILES)? {
            Some(files) => files,
            None => continue,
        };
        for j in 1..=files.len() {
            let file = files.obj(j)?;
            let target = table.present(file.get(FI_TARGET)?, i as u32, j as u32)?;
            if !target.is_null() {
                continue;
            }
            let size = file.get_int(FI_SIZE)?.unwrap_or(0);
            if size == 0 {
                continue;
            }
            blocks.push(BlockInfo {
                path_idx: i as u32,
                file_idx: j as u32,
                size,
            });
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::build_package;
    use crate::package::BuildOptions;
    use std::fs;
    use tempfile::tempdir;

    fn sample_artifact() -> Vec<u8> {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a"), b"first").unwrap();
        fs::write(src.join("b"), b"second file").unwrap();

        let mut o = BuildOptions::new();
        o.set_info("name:sample").unwrap();
        o.set_info("version:1.2").unwrap();
        let mut out = Vec::new();
        build_package(Some(&src), o, &mut out, "sample.pkg").unwrap();
        out
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = sample_artifact();
        bytes[0] ^= 0xff;
        assert!(matches!(
            PackageReader::open(&bytes[..], &NoTrust),
            Err(Error::BadArtifactMagic)
        ));
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let mut bytes = sample_artifact();
        bytes[4] = 9;
        assert!(matches!(
            PackageReader::open(&bytes[..], &NoTrust),
            Err(Error::UnknownCompression(9))
        ));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = sample_artifact();
        assert!(PackageReader::open(&bytes[..20], &NoTrust).is_err());
    }

    #[test]
    fn test_blocks_follow_promised_order() {
        let bytes = sample_artifact();
        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let promised = pkg.expected_blocks().to_vec();
        assert_eq!(promised.len(), 2);

        let mut payload = Vec::new();
        let first = pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(first, promised[0]);
        assert_eq!(payload, b"first");
        payload.clear();
        let second = pkg.next_block(&mut payload).unwrap().unwrap();
        assert_eq!(second, promised[1]);
        assert_eq!(payload, b"second file");
        assert!(pkg.next_block(&mut payload).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_block_header_detected() {
        let mut bytes = sample_artifact();
        // the first data block header sits right after the stored header
        let stored_len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        let block_start = 9 + stored_len;
        bytes[block_start] ^= 0xff;

        let mut pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let err = pkg.next_block(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::BlockOutOfOrder(..)));
    }

    #[test]
    fn test_truncated_block_payload_detected() {
        let bytes = sample_artifact();
        let truncated = &bytes[..bytes.len() - 3];
        let mut pkg = PackageReader::open(truncated, &NoTrust).unwrap();
        let mut sink = Vec::new();
        pkg.next_block(&mut sink).unwrap();
        assert!(pkg.next_block(&mut sink).is_err());
    }

    #[test]
    fn test_expected_id_trust() {
        let bytes = sample_artifact();
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        let mut id = [0u8; crate::digest::PACKAGE_ID_LEN];
        id.copy_from_slice(pkg.package_id().unwrap());

        assert!(PackageReader::open(&bytes[..], &ExpectedId(id)).is_ok());

        let mut wrong = id;
        wrong[0] ^= 1;
        assert!(matches!(
            PackageReader::open(&bytes[..], &ExpectedId(wrong)),
            Err(Error::Verify(_))
        ));
    }

    #[test]
    fn test_verify_id_detects_tampering() {
        let bytes = sample_artifact();
        let pkg = PackageReader::open(&bytes[..], &NoTrust).unwrap();
        assert!(pkg.verify_id().unwrap());

        // tamper with a metadata byte inside the decompressed document
        let stored_len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        let mut doc = zstd::decode_all(&bytes[9..9 + stored_len]).unwrap();
        *doc.last_mut().unwrap() ^= 0xff;

        let recomputed = digest_of_zeroed_id(&doc).unwrap();
        assert_ne!(recomputed.package_id(), pkg.package_id().unwrap());
    }
}
