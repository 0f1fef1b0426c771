//! the self-describing binary container.
//!
//! a document is one append-only buffer: a fixed 12-byte header (magic,
//! root schema id, root value word) followed by payload bytes. offsets
//! only ever grow; the two sanctioned post-seal writes are the root word
//! (written once by [`Document::seal_root`]) and the reserved package-id
//! blob (see [`Document::overwrite_blob`]), whose size was fixed before
//! sealing.

mod read;
mod write;

pub use read::{ArrayReader, ObjectReader};
pub use write::{ArrayWriter, ObjectWriter};

use crate::error::{Error, Result};
use crate::schema;
use crate::value::{self, Value, MAX_PAYLOAD};

/// document magic: format id plus format version
pub const DOCUMENT_MAGIC: [u8; 4] = *b"brl\x01";

const HEADER_LEN: usize = 12;
const ROOT_SLOT: usize = 8;

/// append-only buffer holding one sealed or in-progress document
pub struct Document {
    buf: Vec<u8>,
}

impl Document {
    /// start a fresh document for the given root schema id
    pub fn new(schema_id: u32) -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(&DOCUMENT_MAGIC);
        buf.extend_from_slice(&schema_id.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        Self { buf }
    }

    /// adopt serialized document bytes, validating the header.
    /// an unknown schema id is rejected so a reader never misinterprets
    /// a newer incompatible layout; unknown trailing fields inside
    /// objects are tolerated instead.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        if buf.len() < HEADER_LEN || buf[..4] != DOCUMENT_MAGIC {
            return Err(Error::BadMagic);
        }
        let schema_id = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        if schema_id != schema::ROOT_SCHEMA_PACKAGE {
            return Err(Error::UnknownSchema(schema_id));
        }
        Ok(Self { buf })
    }

    /// root schema id from the header
    pub fn schema_id(&self) -> u32 {
        u32::from_le_bytes(self.buf[4..8].try_into().unwrap())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the header is always present
    }

    /// append raw bytes, returning their offset
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<u32> {
        let offset = self.buf.len();
        if offset + bytes.len() > MAX_PAYLOAD as usize {
            return Err(Error::DocumentTooLarge);
        }
        self.buf.extend_from_slice(bytes);
        Ok(offset as u32)
    }

    /// append one blob value
    pub fn append_blob(&mut self, data: &[u8]) -> Result<Value> {
        self.append_blob_vec(&[data])
    }

    /// append several byte segments as one blob, without gathering them
    /// into an intermediate allocation first
    pub fn append_blob_vec(&mut self, segments: &[&[u8]]) -> Result<Value> {
        let total: usize = segments.iter().map(|s| s.len()).sum();
        let len = u32::try_from(total).map_err(|_| Error::DocumentTooLarge)?;
        let (_, prefix_len) = value::blob_prefix(len);

        if self.buf.len() + prefix_len + total > MAX_PAYLOAD as usize {
            return Err(Error::DocumentTooLarge);
        }
        match prefix_len {
            1 => self.buf.push(len as u8),
            2 => self.buf.extend_from_slice(&(len as u16).to_le_bytes()),
            _ => self.buf.extend_from_slice(&len.to_le_bytes()),
        }
        let offset = self.buf.len() as u32;
        for segment in segments {
            self.buf.extend_from_slice(segment);
        }
        Ok(Value::Blob { offset, len })
    }

    /// encode a value into its wire word, appending out-of-line payload
    /// bytes as needed
    pub(crate) fn encode_value(&mut self, v: Value) -> Result<u32> {
        Ok(match v {
            Value::Null => 0,
            Value::Int(n) => {
                if n <= MAX_PAYLOAD as u64 {
                    value::make_word(value::TAG_INT_INLINE, n as u32)
                } else if let Ok(n32) = u32::try_from(n) {
                    let offset = self.append(&n32.to_le_bytes())?;
                    value::make_word(value::TAG_INT32, offset)
                } else {
                    let offset = self.append(&n.to_le_bytes())?;
                    value::make_word(value::TAG_INT64, offset)
                }
            }
            Value::Blob { offset, len } => {
                let (tag, prefix_len) = value::blob_prefix(len);
                value::make_word(tag, offset - prefix_len as u32)
            }
            Value::Object { offset } => value::make_word(value::TAG_OBJECT, offset),
            Value::Array { offset } => value::make_word(value::TAG_ARRAY, offset),
            Value::Placeholder { id } => {
                if id > MAX_PAYLOAD {
                    return Err(Error::DocumentTooLarge);
                }
                value::make_word(value::TAG_PLACEHOLDER, id)
            }
        })
    }

    /// decode a wire word against this buffer
    pub(crate) fn decode_word(&self, word: u32) -> Result<Value> {
        let (tag, payload) = value::split_word(word);
        Ok(match tag {
            value::TAG_NULL => Value::Null,
            value::TAG_INT_INLINE => Value::Int(payload as u64),
            value::TAG_INT32 => {
                let bytes = self.read_at(payload, 4)?;
                Value::Int(u32::from_le_bytes(bytes.try_into().unwrap()) as u64)
            }
            value::TAG_INT64 => {
                let bytes = self.read_at(payload, 8)?;
                Value::Int(u64::from_le_bytes(bytes.try_into().unwrap()))
            }
            value::TAG_BLOB8 => {
                let len = self.read_at(payload, 1)?[0] as u32;
                self.blob_at(payload + 1, len)?
            }
            value::TAG_BLOB16 => {
                let bytes = self.read_at(payload, 2)?;
                let len = u16::from_le_bytes(bytes.try_into().unwrap()) as u32;
                self.blob_at(payload + 2, len)?
            }
            value::TAG_BLOB32 => {
                let bytes = self.read_at(payload, 4)?;
                let len = u32::from_le_bytes(bytes.try_into().unwrap());
                self.blob_at(payload + 4, len)?
            }
            value::TAG_OBJECT => {
                self.read_at(payload, 4)?;
                Value::Object { offset: payload }
            }
            value::TAG_ARRAY => {
                self.read_at(payload, 4)?;
                Value::Array { offset: payload }
            }
            value::TAG_PLACEHOLDER => Value::Placeholder { id: payload },
            _ => return Err(Error::InvalidValueWord(word)),
        })
    }

    fn blob_at(&self, offset: u32, len: u32) -> Result<Value> {
        self.read_at(offset, len as usize)?;
        Ok(Value::Blob { offset, len })
    }

    /// borrow the bytes of a blob value
    pub fn blob_bytes(&self, v: Value) -> Result<&[u8]> {
        match v {
            Value::Blob { offset, len } => self.read_at(offset, len as usize),
            other => Err(Error::KindMismatch {
                want: "blob",
                got: other.kind_name(),
            }),
        }
    }

    pub(crate) fn read_at(&self, offset: u32, len: usize) -> Result<&[u8]> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::Truncated {
            offset,
            need: len,
            have: 0,
        })?;
        self.buf.get(start..end).ok_or(Error::Truncated {
            offset,
            need: len,
            have: self.buf.len().saturating_sub(start),
        })
    }

    pub(crate) fn read_u32_at(&self, offset: u32) -> Result<u32> {
        let bytes = self.read_at(offset, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// set the single root value; the root must be an object and may
    /// only be set once
    pub fn seal_root(&mut self, root: Value) -> Result<()> {
        if !matches!(root, Value::Object { .. }) {
            return Err(Error::KindMismatch {
                want: "object",
                got: root.kind_name(),
            });
        }
        let existing = u32::from_le_bytes(self.buf[ROOT_SLOT..ROOT_SLOT + 4].try_into().unwrap());
        if existing != 0 {
            return Err(Error::FieldAlreadySet(0));
        }
        let word = self.encode_value(root)?;
        self.buf[ROOT_SLOT..ROOT_SLOT + 4].copy_from_slice(&word.to_le_bytes());
        Ok(())
    }

    /// resolve the root value; readers must go through this first
    pub fn root(&self) -> Result<Value> {
        let word = u32::from_le_bytes(self.buf[ROOT_SLOT..ROOT_SLOT + 4].try_into().unwrap());
        let v = self.decode_word(word)?;
        if v.is_null() {
            return Err(Error::NoRoot);
        }
        Ok(v)
    }

    /// overwrite the bytes of an existing blob in place. lengths must
    /// match exactly: this exists solely for the reserved package-id
    /// field, whose size was schema-fixed before sealing.
    pub fn overwrite_blob(&mut self, v: Value, bytes: &[u8]) -> Result<()> {
        let (offset, len) = match v {
            Value::Blob { offset, len } => (offset, len),
            other => {
                return Err(Error::KindMismatch {
                    want: "blob",
                    got: other.kind_name(),
                })
            }
        };
        if bytes.len() != len as usize {
            return Err(Error::KindMismatch {
                want: "blob of equal length",
                got: "blob",
            });
        }
        self.read_at(offset, len as usize)?;
        let start = offset as usize;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
