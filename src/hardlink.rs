//! hardlink deduplication.
//!
//! during the walk, files sharing an inode are interned here: the first
//! encounter allocates a fresh placeholder id, and every later encounter
//! gets the same placeholder back without the file being re-read or
//! re-hashed. after the document is sealed, a fixup pass builds a side
//! table mapping each placeholder id to the canonical record's path;
//! readers of a target field consult the table instead of the buffer
//! being rewritten. the resolver lives for one build only.

use std::collections::HashMap;

use crate::document::{Document, ObjectReader};
use crate::error::{Error, Result};
use crate::fsmeta::TYPE_BITS_REGULAR;
use crate::schema::{
    DI_FILES, DI_NAME, FI_HASHES, FI_NAME, FI_TARGET, PKG_PATHS, SCHEMA_PACKAGE,
};
use crate::value::Value;

/// build-scoped map of filesystem identity to placeholder ids. ids are
/// handed out monotonically, never reused, and the whole map is dropped
/// at build end.
pub struct HardlinkResolver {
    by_inode: HashMap<(u64, u64), u32>,
}

impl HardlinkResolver {
    pub fn new() -> Self {
        Self {
            by_inode: HashMap::new(),
        }
    }

    /// intern an inode; returns the placeholder shared by all links to
    /// it, and whether this was the first encounter
    pub fn intern(&mut self, dev: u64, ino: u64) -> (Value, bool) {
        if let Some(&id) = self.by_inode.get(&(dev, ino)) {
            return (Value::placeholder(id), false);
        }
        let id = self.by_inode.len() as u32;
        self.by_inode.insert((dev, ino), id);
        (Value::placeholder(id), true)
    }
}

impl Default for HardlinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

struct TargetEntry {
    /// (path index, file index) of the record carrying the content
    canonical: (u32, u32),
    /// resolved `{type bits, canonical path}` blob
    resolved: Value,
}

/// side table produced by the fixup pass.
///
/// resolution never touches already-written words: the serialized bytes
/// keep their placeholder value, and the table supplies the resolved
/// view. it is rebuilt deterministically from the sealed document alone,
/// so a consumer replays the same pass. the canonical record for each
/// placeholder id is the one carrying a content digest; exactly one
/// record per inode does, and because directory records land in
/// post-order it is not necessarily the first record the scan visits.
pub struct TargetTable {
    entries: Vec<Option<TargetEntry>>,
}

impl TargetTable {
    /// run the fixup pass over a sealed document. the resolved path
    /// blobs are appended to the buffer; no existing byte is rewritten.
    pub fn build(doc: &mut Document) -> Result<Self> {
        // stage one: find each placeholder's content-carrying record
        // and its canonical path, reading only
        let mut found: Vec<(u32, (u32, u32), String, bool)> = Vec::new();
        {
            let pkg = ObjectReader::root(doc, &SCHEMA_PACKAGE)?;
            let paths = match pkg.get_arr(PKG_PATHS)? {
                Some(paths) => paths,
                None => return Ok(Self { entries: Vec::new() }),
            };
            for i in 1..=paths.len() {
                let dir = paths.obj(i)?;
                let dirname = dir.get_blob(DI_NAME)?.unwrap_or(b"");
                let files = match dir.get_arr(DI_FILES)? {
                    Some(files) => files,
                    None => continue,
                };
                for j in 1..=files.len() {
                    let file = files.obj(j)?;
                    let id = match file.get(FI_TARGET)? {
                        Value::Placeholder { id } => id,
                        _ => continue,
                    };
                    let has_content = file.get_blob(FI_HASHES)?.is_some();
                    match found.iter().position(|(seen, ..)| *seen == id) {
                        Some(k) => {
                            if has_content && !found[k].3 {
                                let name = file.get_blob(FI_NAME)?.unwrap_or(b"");
                                found[k].1 = (i as u32, j as u32);
                                found[k].2 = record_path(dirname, name);
                                found[k].3 = true;
                            }
                        }
                        None => {
                            let name = file.get_blob(FI_NAME)?.unwrap_or(b"");
                            found.push((
                                id,
                                (i as u32, j as u32),
                                record_path(dirname, name),
                                has_content,
                            ));
                        }
                    }
                }
            }
        }

        // stage two: append the resolved blobs
        let mut entries: Vec<Option<TargetEntry>> = Vec::new();
        for (id, canonical, path, _) in found {
            let type_bits = TYPE_BITS_REGULAR.to_le_bytes();
            let resolved = doc.append_blob_vec(&[&type_bits, path.as_bytes()])?;
            if entries.len() <= id as usize {
                entries.resize_with(id as usize + 1, || None);
            }
            entries[id as usize] = Some(TargetEntry {
                canonical,
                resolved,
            });
        }
        Ok(Self { entries })
    }

    /// present the target of the record at (path_idx, file_idx) whose
    /// raw field decoded to the given value. the canonical record reads
    /// Null (it carries the data); every other record sharing the id
    /// reads the resolved path blob.
    pub fn present(&self, raw: Value, path_idx: u32, file_idx: u32) -> Result<Value> {
        let id = match raw {
            Value::Placeholder { id } => id,
            other => return Ok(other),
        };
        let entry = self
            .entries
            .get(id as usize)
            .and_then(|e| e.as_ref())
            .ok_or(Error::UnresolvedPlaceholder(id))?;
        if entry.canonical == (path_idx, file_idx) {
            Ok(Value::Null)
        } else {
            Ok(entry.resolved)
        }
    }
}

fn record_path(dirname: &[u8], name: &[u8]) -> String {
    let mut path = String::from_utf8_lossy(dirname).into_owned();
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(&String::from_utf8_lossy(name));
    path
}
