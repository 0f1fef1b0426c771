use crate::error::{Error, Result};
use crate::schema::{ArraySchema, Kind, ObjectSchema};
use crate::value::Value;

use super::Document;

fn check_kind(want: Kind, v: Value) -> Result<Value> {
    let ok = match (want, v) {
        (_, Value::Null) => true,
        (_, Value::Placeholder { .. }) => true,
        (Kind::Int, Value::Int(_)) => true,
        (Kind::Blob, Value::Blob { .. }) => true,
        (Kind::Object(_), Value::Object { .. }) => true,
        (Kind::Array(_), Value::Array { .. }) => true,
        _ => false,
    };
    if ok {
        Ok(v)
    } else {
        Err(Error::KindMismatch {
            want: want.name(),
            got: v.kind_name(),
        })
    }
}

/// schema-checked read cursor over one sealed object
pub struct ObjectReader<'d> {
    doc: &'d Document,
    schema: &'static ObjectSchema,
    base: u32,
    count: u32,
}

impl<'d> ObjectReader<'d> {
    /// open a cursor over a sealed object value
    pub fn new(doc: &'d Document, schema: &'static ObjectSchema, v: Value) -> Result<Self> {
        let offset = match v {
            Value::Object { offset } => offset,
            other => {
                return Err(Error::KindMismatch {
                    want: "object",
                    got: other.kind_name(),
                })
            }
        };
        let count = doc.read_u32_at(offset)?;
        // the whole slot block must be in bounds
        doc.read_at(offset + 4, count as usize * 4)?;
        Ok(Self {
            doc,
            schema,
            base: offset + 4,
            count,
        })
    }

    /// open a cursor over the document root
    pub fn root(doc: &'d Document, schema: &'static ObjectSchema) -> Result<Self> {
        let root = doc.root()?;
        Self::new(doc, schema, root)
    }

    pub fn schema(&self) -> &'static ObjectSchema {
        self.schema
    }

    /// number of serialized slots (may be less than the schema's field
    /// count for older writers, or more for newer ones)
    pub fn slot_count(&self) -> u32 {
        self.count
    }

    fn field_kind(&self, index: usize) -> Result<Kind> {
        self.schema
            .field(index)
            .map(|f| f.kind)
            .ok_or(Error::FieldIndexOutOfRange {
                index,
                max: self.schema.max_index(),
            })
    }

    /// fetch a field value; unset and trimmed fields read as Null
    pub fn get(&self, index: usize) -> Result<Value> {
        let kind = self.field_kind(index)?;
        if index as u32 > self.count {
            return Ok(Value::Null);
        }
        let word = self.doc.read_u32_at(self.base + (index as u32 - 1) * 4)?;
        check_kind(kind, self.doc.decode_word(word)?)
    }

    /// integer field, None when unset
    pub fn get_int(&self, index: usize) -> Result<Option<u64>> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Int(n) => Ok(Some(n)),
            other => Err(Error::KindMismatch {
                want: "int",
                got: other.kind_name(),
            }),
        }
    }

    /// blob field bytes, None when unset
    pub fn get_blob(&self, index: usize) -> Result<Option<&'d [u8]>> {
        match self.get(index)? {
            Value::Null => Ok(None),
            v @ Value::Blob { .. } => Ok(Some(self.doc.blob_bytes(v)?)),
            other => Err(Error::KindMismatch {
                want: "blob",
                got: other.kind_name(),
            }),
        }
    }

    /// nested object cursor, typed by the field's schema
    pub fn get_obj(&self, index: usize) -> Result<Option<ObjectReader<'d>>> {
        let kind = self.field_kind(index)?;
        let schema = match kind {
            Kind::Object(s) => s,
            _ => {
                return Err(Error::KindMismatch {
                    want: "object",
                    got: kind.name(),
                })
            }
        };
        match self.get(index)? {
            Value::Null => Ok(None),
            v => Ok(Some(ObjectReader::new(self.doc, schema, v)?)),
        }
    }

    /// nested array cursor, typed by the field's schema
    pub fn get_arr(&self, index: usize) -> Result<Option<ArrayReader<'d>>> {
        let kind = self.field_kind(index)?;
        let schema = match kind {
            Kind::Array(s) => s,
            _ => {
                return Err(Error::KindMismatch {
                    want: "array",
                    got: kind.name(),
                })
            }
        };
        match self.get(index)? {
            Value::Null => Ok(None),
            v => Ok(Some(ArrayReader::new(self.doc, schema, v)?)),
        }
    }
}

/// schema-checked read cursor over one sealed array; elements are 1-based
pub struct ArrayReader<'d> {
    doc: &'d Document,
    schema: &'static ArraySchema,
    base: u32,
    count: u32,
}

impl<'d> ArrayReader<'d> {
    pub fn new(doc: &'d Document, schema: &'static ArraySchema, v: Value) -> Result<Self> {
        let offset = match v {
            Value::Array { offset } => offset,
            other => {
                return Err(Error::KindMismatch {
                    want: "array",
                    got: other.kind_name(),
                })
            }
        };
        let count = doc.read_u32_at(offset)?;
        doc.read_at(offset + 4, count as usize * 4)?;
        Ok(Self {
            doc,
            schema,
            base: offset + 4,
            count,
        })
    }

    /// number of elements
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// fetch element `i` (1-based)
    pub fn element(&self, i: usize) -> Result<Value> {
        if i == 0 || i as u32 > self.count {
            return Err(Error::FieldIndexOutOfRange {
                index: i,
                max: self.count as usize,
            });
        }
        let word = self.doc.read_u32_at(self.base + (i as u32 - 1) * 4)?;
        check_kind(self.schema.element, self.doc.decode_word(word)?)
    }

    /// object cursor for element `i`
    pub fn obj(&self, i: usize) -> Result<ObjectReader<'d>> {
        let schema = match self.schema.element {
            Kind::Object(s) => s,
            other => {
                return Err(Error::KindMismatch {
                    want: "object",
                    got: other.name(),
                })
            }
        };
        ObjectReader::new(self.doc, schema, self.element(i)?)
    }

    /// blob bytes for element `i`
    pub fn blob(&self, i: usize) -> Result<&'d [u8]> {
        self.doc.blob_bytes(self.element(i)?)
    }
}
