use crate::error::{Error, Result};
use crate::schema::{ArraySchema, Kind, ObjectSchema};
use crate::value::Value;

use super::Document;

fn check_kind(want: Kind, v: Value) -> Result<()> {
    let ok = match (want, v) {
        (_, Value::Null) => true,
        (Kind::Int, Value::Int(_)) => true,
        (Kind::Blob, Value::Blob { .. }) => true,
        // placeholders stand in for a blob until the fixup pass
        (Kind::Blob, Value::Placeholder { .. }) => true,
        (Kind::Object(_), Value::Object { .. }) => true,
        (Kind::Array(_), Value::Array { .. }) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::KindMismatch {
            want: want.name(),
            got: v.kind_name(),
        })
    }
}

/// write cursor for one object. fields are write-once; `seal` emits the
/// slot block into the document and consumes the cursor, so inspecting
/// the result takes a fresh [`super::ObjectReader`].
pub struct ObjectWriter {
    schema: &'static ObjectSchema,
    slots: Vec<u32>,
}

impl ObjectWriter {
    pub fn new(schema: &'static ObjectSchema) -> Self {
        Self {
            schema,
            slots: vec![0; schema.max_index()],
        }
    }

    pub fn schema(&self) -> &'static ObjectSchema {
        self.schema
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

    /// set a field to an already-encoded value. setting Null is a no-op;
    /// setting an already-set index is an error.
    pub fn set(&mut self, doc: &mut Document, index: usize, v: Value) -> Result<()> {
        let kind = self.field_kind(index)?;
        if v.is_null() {
            return Ok(());
        }
        check_kind(kind, v)?;
        if self.slots[index - 1] != 0 {
            return Err(Error::FieldAlreadySet(index));
        }
        self.slots[index - 1] = doc.encode_value(v)?;
        Ok(())
    }

    /// set an integer field
    pub fn set_int(&mut self, doc: &mut Document, index: usize, n: u64) -> Result<()> {
        self.set(doc, index, Value::Int(n))
    }

    /// append bytes as a blob and set the field to it. empty input is
    /// skipped like Null, matching the write-only-what-exists discipline.
    pub fn set_blob(&mut self, doc: &mut Document, index: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let v = doc.append_blob(data)?;
        self.set(doc, index, v)
    }

    /// emit the slot block and return the sealed object value.
    /// trailing unset fields are trimmed so older readers and newer
    /// writers stay compatible.
    pub fn seal(self, doc: &mut Document) -> Result<Value> {
        let count = self
            .slots
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);
        let offset = doc.append(&(count as u32).to_le_bytes())?;
        for &word in &self.slots[..count] {
            doc.append(&word.to_le_bytes())?;
        }
        Ok(Value::Object { offset })
    }
}

/// write cursor for one array; append-only, sealed like objects
pub struct ArrayWriter {
    schema: &'static ArraySchema,
    elements: Vec<u32>,
}

impl ArrayWriter {
    pub fn new(schema: &'static ArraySchema) -> Self {
        Self {
            schema,
            elements: Vec::new(),
        }
    }

    /// number of elements appended so far
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// append one element of the array's declared kind
    pub fn append(&mut self, doc: &mut Document, v: Value) -> Result<()> {
        check_kind(self.schema.element, v)?;
        let word = doc.encode_value(v)?;
        self.elements.push(word);
        Ok(())
    }

    /// emit the element block and return the sealed array value
    pub fn seal(self, doc: &mut Document) -> Result<Value> {
        let offset = doc.append(&(self.elements.len() as u32).to_le_bytes())?;
        for &word in &self.elements {
            doc.append(&word.to_le_bytes())?;
        }
        Ok(Value::Array { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ArrayReader, ObjectReader};
    use crate::schema::{
        ACL_GROUP, ACL_MODE, ACL_USER, FI_NAME, FI_SIZE, FI_TARGET, ROOT_SCHEMA_PACKAGE,
        SCHEMA_ACL, SCHEMA_FILE, SCHEMA_XATTR_ARRAY,
    };

    fn doc() -> Document {
        Document::new(ROOT_SCHEMA_PACKAGE)
    }

    #[test]
    fn test_write_read_object() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        w.set_int(&mut d, ACL_MODE, 0o755).unwrap();
        w.set_blob(&mut d, ACL_USER, b"root").unwrap();
        let sealed = w.seal(&mut d).unwrap();

        let r = ObjectReader::new(&d, &SCHEMA_ACL, sealed).unwrap();
        assert_eq!(r.get_int(ACL_MODE).unwrap(), Some(0o755));
        assert_eq!(r.get_blob(ACL_USER).unwrap(), Some(&b"root"[..]));
        // unset field reads as Null
        assert_eq!(r.get(ACL_GROUP).unwrap(), Value::Null);
    }

    #[test]
    fn test_write_once() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        w.set_int(&mut d, ACL_MODE, 0o644).unwrap();
        assert!(matches!(
            w.set_int(&mut d, ACL_MODE, 0o755),
            Err(Error::FieldAlreadySet(ACL_MODE))
        ));
    }

    #[test]
    fn test_set_null_is_noop() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        w.set(&mut d, ACL_MODE, Value::Null).unwrap();
        // still settable afterwards
        w.set_int(&mut d, ACL_MODE, 0o644).unwrap();
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        let blob = d.append_blob(b"x").unwrap();
        assert!(matches!(
            w.set(&mut d, ACL_MODE, blob),
            Err(Error::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        assert!(matches!(
            w.set_int(&mut d, 99, 1),
            Err(Error::FieldIndexOutOfRange { index: 99, .. })
        ));
    }

    #[test]
    fn test_placeholder_allowed_in_blob_field() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_FILE);
        w.set_blob(&mut d, FI_NAME, b"link").unwrap();
        w.set(&mut d, FI_TARGET, Value::placeholder(3)).unwrap();
        let sealed = w.seal(&mut d).unwrap();

        let r = ObjectReader::new(&d, &SCHEMA_FILE, sealed).unwrap();
        assert_eq!(r.get(FI_TARGET).unwrap(), Value::Placeholder { id: 3 });
    }

    #[test]
    fn test_trailing_unset_fields_trimmed() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_FILE);
        w.set_blob(&mut d, FI_NAME, b"f").unwrap();
        let sealed = w.seal(&mut d).unwrap();

        let r = ObjectReader::new(&d, &SCHEMA_FILE, sealed).unwrap();
        // slot count stops at the highest set index
        assert_eq!(r.slot_count(), FI_NAME as u32);
        assert_eq!(r.get(FI_SIZE).unwrap(), Value::Null);
    }

    #[test]
    fn test_array_append_and_read() {
        let mut d = doc();
        let mut a = ArrayWriter::new(&SCHEMA_XATTR_ARRAY);
        let b1 = d.append_blob(b"one").unwrap();
        let b2 = d.append_blob(b"two").unwrap();
        a.append(&mut d, b1).unwrap();
        a.append(&mut d, b2).unwrap();
        assert_eq!(a.len(), 2);
        let sealed = a.seal(&mut d).unwrap();

        let r = ArrayReader::new(&d, &SCHEMA_XATTR_ARRAY, sealed).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.blob(1).unwrap(), b"one");
        assert_eq!(r.blob(2).unwrap(), b"two");
    }

    #[test]
    fn test_array_rejects_wrong_element_kind() {
        let mut d = doc();
        let mut a = ArrayWriter::new(&SCHEMA_XATTR_ARRAY);
        assert!(matches!(
            a.append(&mut d, Value::Int(1)),
            Err(Error::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_array_seals() {
        let mut d = doc();
        let a = ArrayWriter::new(&SCHEMA_XATTR_ARRAY);
        let sealed = a.seal(&mut d).unwrap();
        let r = ArrayReader::new(&d, &SCHEMA_XATTR_ARRAY, sealed).unwrap();
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn test_empty_blob_skipped() {
        let mut d = doc();
        let mut w = ObjectWriter::new(&SCHEMA_ACL);
        w.set_blob(&mut d, ACL_USER, b"").unwrap();
        let sealed = w.seal(&mut d).unwrap();
        let r = ObjectReader::new(&d, &SCHEMA_ACL, sealed).unwrap();
        assert_eq!(r.get(ACL_USER).unwrap(), Value::Null);
    }
}
