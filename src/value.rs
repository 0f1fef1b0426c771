//! tagged value words.
//!
//! every field slot and array element is one little-endian u32 word: a
//! 4-bit tag and a 28-bit payload. small integers ride inline; everything
//! else carries an offset into the document buffer. the in-memory `Value`
//! is the decoded form; the document module owns the word<->bytes
//! conversion since out-of-line payloads live in its buffer.

/// largest offset or inline integer a word payload can carry
pub const MAX_PAYLOAD: u32 = 0x0FFF_FFFF;

pub(crate) const TAG_NULL: u8 = 0x0;
pub(crate) const TAG_INT_INLINE: u8 = 0x1;
pub(crate) const TAG_INT32: u8 = 0x2;
pub(crate) const TAG_INT64: u8 = 0x3;
pub(crate) const TAG_BLOB8: u8 = 0x4;
pub(crate) const TAG_BLOB16: u8 = 0x5;
pub(crate) const TAG_BLOB32: u8 = 0x6;
pub(crate) const TAG_OBJECT: u8 = 0x7;
pub(crate) const TAG_ARRAY: u8 = 0x8;
pub(crate) const TAG_PLACEHOLDER: u8 = 0xF;

/// split a word into (tag, payload)
pub(crate) fn split_word(word: u32) -> (u8, u32) {
    ((word >> 28) as u8, word & MAX_PAYLOAD)
}

/// assemble a word from tag and payload; payload must fit 28 bits
pub(crate) fn make_word(tag: u8, payload: u32) -> u32 {
    debug_assert!(payload <= MAX_PAYLOAD);
    ((tag as u32) << 28) | (payload & MAX_PAYLOAD)
}

/// one decoded tagged value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    /// unset / absent
    Null,
    /// integer, any width
    Int(u64),
    /// out-of-line byte string; offset points at the data (past the
    /// length prefix)
    Blob { offset: u32, len: u32 },
    /// nested object block
    Object { offset: u32 },
    /// nested array block
    Array { offset: u32 },
    /// build-time indirection, resolved by the hardlink fixup pass;
    /// never legal to hand to a consumer of a finalized document
    Placeholder { id: u32 },
}

impl Value {
    /// fresh placeholder with the given id
    pub fn placeholder(id: u32) -> Self {
        Value::Placeholder { id }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder { .. })
    }

    /// kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Blob { .. } => "blob",
            Value::Object { .. } => "object",
            Value::Array { .. } => "array",
            Value::Placeholder { .. } => "placeholder",
        }
    }
}

/// length-prefix width for a blob of `len` bytes, with its wire tag
pub(crate) fn blob_prefix(len: u32) -> (u8, usize) {
    if len < 0x100 {
        (TAG_BLOB8, 1)
    } else if len < 0x1_0000 {
        (TAG_BLOB16, 2)
    } else {
        (TAG_BLOB32, 4)
    }
}
