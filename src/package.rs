use crate::document::{Document, ObjectWriter};
use crate::emit::Compression;
use crate::error::{Error, Result};
use crate::schema::{
    Kind, PI_FILE_SIZE, PI_HASHES, PI_INSTALLED_SIZE, PKG_REPLACES_PRIORITY, SCHEMA_PACKAGE,
    SCHEMA_PKGINFO, SCHEMA_SCRIPTS, PI_ARCH, PI_NAME, PI_VERSION,
};
use crate::value::Value;

/// architecture stamped into packages when none is supplied
pub const DEFAULT_ARCH: &str = "x86_64";

/// metadata and knobs for one package build.
///
/// an explicit options value is threaded through the whole build; no
/// operation depends on process-wide state.
pub struct BuildOptions {
    info: Vec<Option<String>>,
    replaces_priority: Option<String>,
    scripts: Vec<Option<Vec<u8>>>,
    triggers: Vec<String>,
    /// emit a record for the tree root itself
    pub rootnode: bool,
    /// architecture used when the `arch` field is not assigned
    pub default_arch: String,
    /// compression applied to the artifact's header section
    pub compression: Compression,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self {
            info: vec![None; SCHEMA_PKGINFO.max_index()],
            replaces_priority: None,
            scripts: vec![None; SCHEMA_SCRIPTS.max_index()],
            triggers: Vec::new(),
            rootnode: true,
            default_arch: DEFAULT_ARCH.to_string(),
            compression: Compression::default(),
        }
    }

    /// apply one `"field-name:value"` assignment, resolved against the
    /// pkginfo schema first and the package schema second. computed
    /// fields and unknown names are rejected.
    pub fn set_info(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once(':')
            .ok_or_else(|| Error::InvalidAssignment(assignment.to_string()))?;

        if let Some(index) = SCHEMA_PKGINFO.field_index_by_name(name) {
            match index {
                PI_HASHES | PI_INSTALLED_SIZE | PI_FILE_SIZE => {
                    return Err(Error::ReservedField(
                        SCHEMA_PKGINFO.field(index).unwrap().name,
                    ))
                }
                _ => {
                    self.info[index - 1] = Some(value.to_string());
                    return Ok(());
                }
            }
        }

        if SCHEMA_PACKAGE.field_index_by_name(name) == Some(PKG_REPLACES_PRIORITY) {
            self.replaces_priority = Some(value.to_string());
            return Ok(());
        }

        Err(Error::UnknownField(name.to_string()))
    }

    /// attach a script body by kind name (pre-install, post-install, ...)
    pub fn set_script(&mut self, kind: &str, body: Vec<u8>) -> Result<()> {
        let index = SCHEMA_SCRIPTS
            .field_index_by_name(kind)
            .ok_or_else(|| Error::UnknownField(kind.to_string()))?;
        self.scripts[index - 1] = Some(body);
        Ok(())
    }

    /// append an install trigger pattern
    pub fn add_trigger(&mut self, trigger: impl Into<String>) {
        self.triggers.push(trigger.into());
    }

    /// ensure required fields are present and default the architecture
    pub(crate) fn finish_init(&mut self) -> Result<()> {
        for required in [PI_NAME, PI_VERSION] {
            if self.info[required - 1].is_none() {
                return Err(Error::MissingField(
                    SCHEMA_PKGINFO.field(required).unwrap().name,
                ));
            }
        }
        if self.info[PI_ARCH - 1].is_none() {
            self.info[PI_ARCH - 1] = Some(self.default_arch.clone());
        }
        Ok(())
    }

    pub(crate) fn has_scripts(&self) -> bool {
        self.scripts.iter().any(|s| s.is_some())
    }

    pub(crate) fn scripts(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.scripts
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|body| (i + 1, body)))
    }

    pub(crate) fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub(crate) fn replaces_priority(&self) -> Option<&str> {
        self.replaces_priority.as_deref()
    }

    /// write the assigned pkginfo fields into a writer, converting each
    /// string through the field's declared kind
    pub(crate) fn assign_info(&self, doc: &mut Document, w: &mut ObjectWriter) -> Result<()> {
        for (i, value) in self.info.iter().enumerate() {
            if let Some(value) = value {
                set_from_string(w, doc, i + 1, value)?;
            }
        }
        Ok(())
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// parse a string value through a field's declared kind and set it
pub(crate) fn set_from_string(
    w: &mut ObjectWriter,
    doc: &mut Document,
    index: usize,
    s: &str,
) -> Result<()> {
    let field = w
        .schema()
        .field(index)
        .ok_or(Error::FieldIndexOutOfRange {
            index,
            max: w.schema().max_index(),
        })?;
    match field.kind {
        Kind::Int => {
            let n: u64 = s.parse().map_err(|_| Error::InvalidFieldValue {
                field: field.name.to_string(),
                reason: format!("not an integer: {s}"),
            })?;
            w.set(doc, index, Value::Int(n))
        }
        Kind::Blob => w.set_blob(doc, index, s.as_bytes()),
        _ => Err(Error::InvalidFieldValue {
            field: field.name.to_string(),
            reason: "field is not assignable from a string".to_string(),
        }),
    }
}
